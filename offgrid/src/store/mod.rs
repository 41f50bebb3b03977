//! Disk-backed tile store.
//!
//! Holds the bytes of every downloaded tile, keyed by `(region, z, x, y)`.
//! The filesystem is the single source of truth: a tile counts as downloaded
//! exactly when its file exists, so no separate ledger can drift out of sync
//! after a crash.

mod disk;
mod path;

pub use disk::TileStore;
pub use path::{region_directory, tile_path, TILES_DIR, TILE_EXTENSION};

use std::path::PathBuf;
use thiserror::Error;

/// Tile store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested tile is not on disk
    #[error("Tile not found: {0}")]
    NotFound(PathBuf),

    /// Writing a tile failed
    #[error("Failed to write tile {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure
    #[error("Tile store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
