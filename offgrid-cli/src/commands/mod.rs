//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, path, show)
//! - [`download`] - Download a region with live progress
//! - [`region`] - Region management (add, list, show, rename, delete)
//! - [`resolve`] - Resolve one tile through the offline-first policy
//! - [`tile`] - Tile math for a point

pub mod config;
pub mod download;
pub mod region;
pub mod resolve;
pub mod tile;

use crate::error::CliError;
use offgrid::coord::{CoordError, GeoPoint, MAX_ZOOM};

/// Validate a point and zoom given on the command line.
pub(crate) fn validate_point(lat: f64, lon: f64, zoom: u8) -> Result<GeoPoint, CliError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom).into());
    }
    let point = GeoPoint::new(lat, lon);
    point.validate()?;
    Ok(point)
}
