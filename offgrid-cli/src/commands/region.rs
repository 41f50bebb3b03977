//! Region management CLI commands.

use clap::Subcommand;
use offgrid::config::format_size;
use offgrid::coord::{BoundingBox, MAX_ZOOM};
use offgrid::manager::OfflineManager;
use offgrid::region::{NewRegion, Region, RegionId};

use crate::error::CliError;

/// Region subcommands.
#[derive(Debug, Subcommand)]
pub enum RegionCommands {
    /// Register a new region
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Northern edge in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        north: f64,

        /// Southern edge in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        south: f64,

        /// Eastern edge in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        east: f64,

        /// Western edge in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        west: f64,

        /// Lowest zoom level to download
        #[arg(long, default_value_t = 0)]
        min_zoom: u8,

        /// Highest zoom level to download
        #[arg(long)]
        max_zoom: u8,
    },

    /// List all regions
    List,

    /// Show one region in detail
    Show { id: String },

    /// Rename a region
    Rename { id: String, name: String },

    /// Delete a region and its tiles
    Delete { id: String },
}

/// Run a region subcommand.
pub async fn run(manager: &OfflineManager, command: RegionCommands) -> Result<(), CliError> {
    match command {
        RegionCommands::Add {
            name,
            north,
            south,
            east,
            west,
            min_zoom,
            max_zoom,
        } => {
            if min_zoom > max_zoom || max_zoom > MAX_ZOOM {
                return Err(CliError::InvalidArgument(format!(
                    "Zoom range {}-{} is invalid (0 <= min <= max <= {})",
                    min_zoom, max_zoom, MAX_ZOOM
                )));
            }
            let bbox = BoundingBox::new(north, south, east, west);
            bbox.validate()?;

            let region = manager.add_region(NewRegion::new(name, bbox, min_zoom, max_zoom))?;
            println!("Added region {}", region.id);
            print_details(&region);
        }
        RegionCommands::List => {
            let regions = manager.regions();
            if regions.is_empty() {
                println!("No regions. Add one with 'offgrid region add'.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<20}  {:>5}  {:>12}  {:>9}",
                "ID", "NAME", "ZOOM", "TILES", "SIZE"
            );
            for region in &regions {
                println!("{}", summary_line(region));
            }
        }
        RegionCommands::Show { id } => {
            let region = find(manager, &id)?;
            print_details(&region);
        }
        RegionCommands::Rename { id, name } => {
            let region = manager.rename_region(&RegionId::from(id), name)?;
            println!("Renamed region {} to '{}'", region.id, region.name);
        }
        RegionCommands::Delete { id } => {
            let region = manager.delete_region(&RegionId::from(id)).await?;
            println!("Deleted region '{}' ({})", region.name, region.id);
        }
    }
    Ok(())
}

fn find(manager: &OfflineManager, id: &str) -> Result<Region, CliError> {
    manager
        .region(&RegionId::from(id))
        .ok_or_else(|| CliError::InvalidArgument(format!("No region with id '{}'", id)))
}

/// The size worth showing: measured once complete, estimated before.
fn display_size(region: &Region) -> String {
    if region.is_complete() && region.actual_size_bytes > 0 {
        format_size(region.actual_size_bytes)
    } else {
        format!("~{}", format_size(region.estimated_size_bytes))
    }
}

fn summary_line(region: &Region) -> String {
    format!(
        "{:<36}  {:<20}  {:>5}  {:>12}  {:>9}",
        region.id,
        truncate(&region.name, 20),
        format!("{}-{}", region.min_zoom, region.max_zoom),
        format!("{}/{}", region.downloaded_tiles, region.total_tiles),
        display_size(region),
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn print_details(region: &Region) {
    println!("  Name:     {}", region.name);
    println!("  ID:       {}", region.id);
    println!(
        "  Bounds:   N {:.5}  S {:.5}  E {:.5}  W {:.5}",
        region.bbox.north, region.bbox.south, region.bbox.east, region.bbox.west
    );
    println!("  Zoom:     {}-{}", region.min_zoom, region.max_zoom);
    println!(
        "  Tiles:    {}/{} ({:.1}%)",
        region.downloaded_tiles,
        region.total_tiles,
        region.progress() * 100.0
    );
    println!("  Size:     {}", display_size(region));
    println!("  Created:  {}", region.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
}
