//! Tile command - show the tile containing a point and its bounds.

use clap::Args;
use offgrid::coord::{tile_at, tile_bounds};

use super::validate_point;
use crate::error::CliError;

/// Arguments for the tile command.
#[derive(Debug, Args)]
pub struct TileArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level
    #[arg(long)]
    pub zoom: u8,
}

/// Run the tile command.
pub fn run(args: TileArgs) -> Result<(), CliError> {
    let point = validate_point(args.lat, args.lon, args.zoom)?;
    let tile = tile_at(point, args.zoom);
    let bounds = tile_bounds(&tile);

    println!("Tile: {}", tile);
    println!("  North: {:.6}", bounds.north);
    println!("  South: {:.6}", bounds.south);
    println!("  East:  {:.6}", bounds.east);
    println!("  West:  {:.6}", bounds.west);

    Ok(())
}
