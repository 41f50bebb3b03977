//! Offline regions and their persistent registry.
//!
//! A region is a bounding box plus a zoom range. The registry owns the list
//! of regions, persists it as a JSON index next to the tile store, and
//! answers "which downloaded region covers this point at this zoom".

mod registry;
mod types;

pub use registry::{RegionRegistry, INDEX_FILE_NAME};
pub use types::{NewRegion, Region, RegionId, AVERAGE_TILE_SIZE_BYTES};

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Region registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Region not found: {0}")]
    RegionNotFound(RegionId),

    /// The index file could not be parsed and was replaced by an empty registry
    #[error("Region index {path} is corrupt: {reason}")]
    RegionIndexCorrupt { path: PathBuf, reason: String },

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Region index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize region index: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
