//! Download command - download a region with live progress.
//!
//! Runs one session to completion. Ctrl-C cancels the session, waits for
//! in-flight tiles to finish, and keeps what was stored.

use clap::Args;
use offgrid::config::format_size;
use offgrid::download::{DownloadEvent, DownloadState};
use offgrid::manager::OfflineManager;
use offgrid::region::RegionId;
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use crate::error::CliError;

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Region to download
    pub id: String,
}

/// Run the download command.
pub async fn run(manager: &OfflineManager, args: DownloadArgs) -> Result<(), CliError> {
    let id = RegionId::from(args.id);
    let region = manager
        .region(&id)
        .ok_or_else(|| CliError::InvalidArgument(format!("No region with id '{}'", id)))?;

    println!(
        "Downloading '{}': {} tiles, zoom {}-{}",
        region.name, region.total_tiles, region.min_zoom, region.max_zoom
    );

    let mut events = manager.subscribe();
    manager.start_download(&id)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                println!("Cancelling, waiting for in-flight tiles...");
                info!(region = %id, "Download interrupted by user");
                let status = manager.cancel_download().await?;
                println!(
                    "Cancelled with {}/{} tiles stored",
                    status.downloaded, status.total
                );
                return Err(CliError::Interrupted);
            }
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    if event.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => {
                    if manager.status().is_some_and(|s| s.state.is_terminal()) {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    let status = manager.wait_for_download().await;
    match status.map(|s| (s.state, s.failed)) {
        Some((DownloadState::Completed, _)) => Ok(()),
        Some((DownloadState::Cancelled, _)) => Err(CliError::Interrupted),
        Some((_, failed)) => Err(CliError::DownloadFailed {
            failed,
            last_error: manager.last_error(),
        }),
        None => Ok(()),
    }
}

fn print_event(event: &DownloadEvent) {
    match event {
        DownloadEvent::Started {
            already_downloaded,
            total,
            ..
        } => {
            if *already_downloaded > 0 {
                println!("Resuming: {}/{} tiles already stored", already_downloaded, total);
            }
        }
        DownloadEvent::Progress {
            downloaded,
            total,
            failed,
            progress,
            ..
        } => {
            print!(
                "\r  {}/{} tiles ({:.1}%){}",
                downloaded,
                total,
                progress * 100.0,
                if *failed > 0 {
                    format!(", {} failed", failed)
                } else {
                    String::new()
                }
            );
            let _ = std::io::stdout().flush();
        }
        DownloadEvent::Paused { .. } => println!("\nPaused"),
        DownloadEvent::Resumed { downloaded, .. } => {
            println!("\nResumed at {} tiles", downloaded)
        }
        DownloadEvent::Completed {
            actual_size_bytes, ..
        } => {
            println!();
            println!("Completed: {} on disk", format_size(*actual_size_bytes));
        }
        DownloadEvent::Cancelled { .. } => println!("\nCancelled"),
        DownloadEvent::Failed {
            failed_tile_count, ..
        } => {
            println!();
            println!("Finished with {} failed tiles", failed_tile_count);
        }
    }
}
