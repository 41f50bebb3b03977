//! Session coordinator.
//!
//! One coordinator task runs per download session. It owns every piece of
//! mutable session state (pending queue, counters, state) and is the only
//! writer of the region's progress in the registry. Fetch tasks run in a
//! bounded `JoinSet` and report back through their join results.

use super::state::{DownloadEvent, DownloadState, DownloadStatus};
use super::worker::{fetch_tile, TileOutcome};
use crate::config::DownloadConfig;
use crate::coord::{tiles_for_region, TileCoord};
use crate::region::{Region, RegionId, RegionRegistry};
use crate::source::TileSource;
use crate::store::TileStore;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Existence checks in flight while scanning the store.
const SCAN_CONCURRENCY: usize = 32;

/// Minimum gap between index writes for per-tile progress. Pause and
/// terminal transitions always write.
const PROGRESS_PERSIST_INTERVAL: Duration = Duration::from_millis(500);

/// Shared collaborators of a session.
pub(crate) struct SessionContext<S> {
    pub source: Arc<S>,
    pub store: Arc<TileStore>,
    pub registry: Arc<RegionRegistry>,
    pub config: DownloadConfig,
    pub events: broadcast::Sender<DownloadEvent>,
    pub last_error: Arc<Mutex<Option<String>>>,
}

/// Control channels handed to the coordinator.
pub(crate) struct SessionControl {
    pub paused: watch::Receiver<bool>,
    pub cancellation_token: CancellationToken,
    pub status: watch::Sender<DownloadStatus>,
}

pub(crate) struct Session<S: TileSource + 'static> {
    ctx: SessionContext<S>,
    control: SessionControl,
    region_id: RegionId,
    /// Ordered list of every tile of the region.
    tiles: Vec<TileCoord>,
    queue: VecDeque<TileCoord>,
    in_flight: JoinSet<TileOutcome>,
    downloaded: u64,
    failed: u64,
    paused: bool,
    state: DownloadState,
    last_persist: Option<Instant>,
}

impl<S: TileSource + 'static> Session<S> {
    pub(crate) fn new(ctx: SessionContext<S>, control: SessionControl, region: &Region) -> Self {
        Self {
            ctx,
            control,
            region_id: region.id.clone(),
            tiles: tiles_for_region(&region.bbox, region.min_zoom, region.max_zoom).collect(),
            queue: VecDeque::new(),
            in_flight: JoinSet::new(),
            downloaded: 0,
            failed: 0,
            paused: false,
            state: DownloadState::Idle,
            last_persist: None,
        }
    }

    /// Drives the session to a terminal state.
    pub(crate) async fn run(mut self) {
        self.scan().await;
        self.state = DownloadState::Downloading;
        self.paused = *self.control.paused.borrow_and_update();

        info!(
            region = %self.region_id,
            total = self.tiles.len(),
            already_downloaded = self.downloaded,
            pending = self.queue.len(),
            source = self.ctx.source.name(),
            "Download session started"
        );
        self.emit(DownloadEvent::Started {
            region_id: self.region_id.clone(),
            total: self.total(),
            already_downloaded: self.downloaded,
        });
        self.record_progress();

        self.fetch_loop().await;

        if self.control.cancellation_token.is_cancelled() {
            self.drain().await;
            self.finish_cancelled();
        } else {
            self.finish().await;
        }
    }

    async fn fetch_loop(&mut self) {
        loop {
            if self.control.cancellation_token.is_cancelled() {
                return;
            }

            if !self.paused {
                self.dispatch();
            }

            if self.in_flight.is_empty() {
                if self.paused {
                    self.enter_paused();
                    self.wait_for_control().await;
                    continue;
                }
                if self.queue.is_empty() {
                    return;
                }
                continue;
            }

            tokio::select! {
                biased;

                _ = self.control.cancellation_token.cancelled() => {
                    debug!(
                        region = %self.region_id,
                        pending = self.queue.len(),
                        active = self.in_flight.len(),
                        "Download cancelled, draining in-flight fetches"
                    );
                }

                changed = self.control.paused.changed() => {
                    self.on_control_changed(changed.is_ok()).await;
                }

                Some(result) = self.in_flight.join_next() => {
                    match result {
                        Ok(outcome) => self.on_outcome(outcome),
                        Err(join_err) => {
                            warn!(region = %self.region_id, error = %join_err, "Fetch task panicked");
                            self.failed += 1;
                            self.record_progress();
                        }
                    }
                }
            }
        }
    }

    /// Fills the in-flight set up to the parallelism limit.
    fn dispatch(&mut self) {
        while self.in_flight.len() < self.ctx.config.parallel_downloads() {
            let Some(tile) = self.queue.pop_front() else {
                break;
            };
            self.in_flight.spawn(fetch_tile(
                self.region_id.clone(),
                tile,
                Arc::clone(&self.ctx.source),
                Arc::clone(&self.ctx.store),
                self.ctx.config,
                self.control.cancellation_token.clone(),
            ));
        }
        self.publish_status();
    }

    fn on_outcome(&mut self, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Stored { .. } => {
                self.downloaded += 1;
            }
            TileOutcome::Failed { tile, error, .. } => {
                self.failed += 1;
                *self.ctx.last_error.lock() = Some(format!("Tile {} failed: {}", tile, error));
            }
            TileOutcome::Cancelled { tile } => {
                debug!(region = %self.region_id, tile = %tile, "Tile fetch cancelled");
                return;
            }
        }
        self.record_progress();
    }

    /// Waits while paused for a resume or cancellation.
    async fn wait_for_control(&mut self) {
        tokio::select! {
            biased;
            _ = self.control.cancellation_token.cancelled() => {}
            changed = self.control.paused.changed() => {
                self.on_control_changed(changed.is_ok()).await;
            }
        }
    }

    async fn on_control_changed(&mut self, open: bool) {
        if !open {
            // The downloader is gone; nobody can resume or observe us.
            self.control.cancellation_token.cancel();
            return;
        }

        let paused = *self.control.paused.borrow_and_update();
        if paused == self.paused {
            return;
        }
        self.paused = paused;

        if paused {
            info!(region = %self.region_id, in_flight = self.in_flight.len(), "Pausing download");
        } else if self.state == DownloadState::Paused {
            self.scan().await;
            self.state = DownloadState::Downloading;
            info!(
                region = %self.region_id,
                downloaded = self.downloaded,
                pending = self.queue.len(),
                "Download resumed"
            );
            self.emit(DownloadEvent::Resumed {
                region_id: self.region_id.clone(),
                downloaded: self.downloaded,
            });
            self.persist_progress(true);
            self.record_progress();
        }
    }

    fn enter_paused(&mut self) {
        if self.state == DownloadState::Paused {
            return;
        }
        self.state = DownloadState::Paused;
        info!(region = %self.region_id, downloaded = self.downloaded, "Download paused");
        self.persist_progress(true);
        self.publish_status();
        self.emit(DownloadEvent::Paused {
            region_id: self.region_id.clone(),
        });
    }

    /// Rebuilds the queue from the full tile list against the store.
    ///
    /// Tiles on disk count as downloaded; the failed count starts over.
    async fn scan(&mut self) {
        let store = Arc::clone(&self.ctx.store);
        let region_id = self.region_id.clone();
        let present: Vec<bool> = stream::iter(self.tiles.clone())
            .map(move |tile| {
                let store = Arc::clone(&store);
                let region_id = region_id.clone();
                async move { store.exists(region_id.as_str(), &tile).await }
            })
            .buffered(SCAN_CONCURRENCY)
            .collect()
            .await;

        self.queue.clear();
        self.downloaded = 0;
        self.failed = 0;
        for (tile, on_disk) in self.tiles.iter().zip(present) {
            if on_disk {
                self.downloaded += 1;
            } else {
                self.queue.push_back(*tile);
            }
        }
    }

    /// Waits for every in-flight fetch, keeping their results.
    async fn drain(&mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Ok(outcome) = result {
                self.on_outcome(outcome);
            }
        }
    }

    /// Terminal events go out before the terminal status so that anyone
    /// woken by the status has already been sent the event.
    fn finish_cancelled(&mut self) {
        self.queue.clear();
        self.persist_progress(true);
        self.state = DownloadState::Cancelled;
        info!(
            region = %self.region_id,
            downloaded = self.downloaded,
            total = self.total(),
            "Download cancelled"
        );
        self.emit(DownloadEvent::Cancelled {
            region_id: self.region_id.clone(),
        });
        self.publish_status();
    }

    async fn finish(&mut self) {
        self.persist_progress(true);
        if self.downloaded >= self.total() {
            let actual_size_bytes = match self.ctx.store.size(self.region_id.as_str()).await {
                Ok(size) => size,
                Err(e) => {
                    warn!(region = %self.region_id, error = %e, "Failed to measure region size");
                    0
                }
            };
            if let Err(e) = self
                .ctx
                .registry
                .set_actual_size(&self.region_id, actual_size_bytes)
            {
                self.registry_failed(e);
            }

            self.state = DownloadState::Completed;
            info!(
                region = %self.region_id,
                tiles = self.downloaded,
                bytes = actual_size_bytes,
                "Download completed"
            );
            self.emit(DownloadEvent::Completed {
                region_id: self.region_id.clone(),
                actual_size_bytes,
            });
            self.publish_status();
        } else {
            self.state = DownloadState::Failed;
            *self.ctx.last_error.lock() = Some(format!(
                "{} of {} tiles failed to download",
                self.failed,
                self.total()
            ));
            warn!(
                region = %self.region_id,
                downloaded = self.downloaded,
                failed = self.failed,
                total = self.total(),
                "Download finished with failed tiles"
            );
            self.emit(DownloadEvent::Failed {
                region_id: self.region_id.clone(),
                failed_tile_count: self.failed,
            });
            self.publish_status();
        }
    }

    /// Persists progress (throttled), then publishes status and a progress
    /// event.
    fn record_progress(&mut self) {
        self.persist_progress(false);
        self.publish_status();
        let status = self.control.status.borrow().clone();
        self.emit(DownloadEvent::Progress {
            region_id: self.region_id.clone(),
            downloaded: status.downloaded,
            total: status.total,
            failed: status.failed,
            progress: status.progress(),
        });
    }

    /// Writes the downloaded count to the registry. Unforced writes are
    /// skipped within [`PROGRESS_PERSIST_INTERVAL`] of the previous one.
    fn persist_progress(&mut self, force: bool) {
        let recent = self
            .last_persist
            .is_some_and(|at| at.elapsed() < PROGRESS_PERSIST_INTERVAL);
        if recent && !force {
            return;
        }
        if let Err(e) = self
            .ctx
            .registry
            .set_downloaded(&self.region_id, self.downloaded)
        {
            self.registry_failed(e);
        }
        self.last_persist = Some(Instant::now());
    }

    fn registry_failed(&self, e: crate::region::RegistryError) {
        warn!(region = %self.region_id, error = %e, "Failed to record region progress");
        *self.ctx.last_error.lock() = Some(e.to_string());
    }

    fn publish_status(&self) {
        let status = DownloadStatus {
            region_id: self.region_id.clone(),
            state: self.state,
            downloaded: self.downloaded,
            total: self.total(),
            failed: self.failed,
            in_flight: self.in_flight.len(),
        };
        self.control.status.send_replace(status);
    }

    fn emit(&self, event: DownloadEvent) {
        // No subscribers is fine.
        let _ = self.ctx.events.send(event);
    }

    fn total(&self) -> u64 {
        self.tiles.len() as u64
    }
}
