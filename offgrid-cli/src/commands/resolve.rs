//! Resolve command - fetch one tile through the offline-first policy.

use clap::Args;
use offgrid::coord::tile_at;
use offgrid::manager::OfflineManager;
use offgrid::resolver::TileOrigin;
use std::path::PathBuf;

use super::validate_point;
use crate::error::CliError;

/// Arguments for the resolve command.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Write the tile bytes to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Treat the network as unreachable
    #[arg(long)]
    pub offline: bool,
}

/// Run the resolve command.
pub async fn run(manager: &OfflineManager, args: ResolveArgs) -> Result<(), CliError> {
    let point = validate_point(args.lat, args.lon, args.zoom)?;
    let tile = tile_at(point, args.zoom);

    let resolved = manager.resolve_detailed(tile, point).await;

    let origin = match resolved.origin {
        TileOrigin::Cache => match manager.find_region(point, args.zoom) {
            Some(region) => format!("offline region '{}'", region.name),
            None => "offline cache".to_string(),
        },
        TileOrigin::Network => "live server".to_string(),
        TileOrigin::Placeholder => "placeholder".to_string(),
    };
    println!("Tile {}: {} bytes from {}", tile, resolved.data.len(), origin);

    if let Some(path) = args.output {
        std::fs::write(&path, &resolved.data).map_err(|error| CliError::FileWrite {
            path: path.clone(),
            error,
        })?;
        println!("Saved to {}", path.display());
    }

    Ok(())
}
