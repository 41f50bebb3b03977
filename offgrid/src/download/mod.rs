//! Region downloads.
//!
//! The [`Downloader`] turns a registered region into files in the tile
//! store. At most one session runs at a time; it can be paused, resumed and
//! cancelled, and publishes [`DownloadEvent`]s as it goes.
//!
//! # Session lifecycle
//!
//! 1. The region's tiles are enumerated in (zoom, x, y) order and checked
//!    against the store. Tiles already on disk count as downloaded.
//! 2. Missing tiles are fetched with at most `parallel_downloads` in flight.
//!    Each tile is retried with exponential backoff; a tile that exhausts its
//!    retries is recorded as failed and the session carries on.
//! 3. When the queue is empty the session ends `Completed` if every tile is
//!    on disk, otherwise `Failed`.
//!
//! Because "downloaded" is read back from the store, a session interrupted
//! by a crash resumes where it left off on the next start.

mod downloader;
mod session;
mod state;
mod worker;

#[cfg(test)]
mod tests;

pub use downloader::{Downloader, RegionBlock};
pub use state::{DownloadEvent, DownloadState, DownloadStatus};

use crate::region::{RegionId, RegistryError};
use thiserror::Error;

/// Downloader errors.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Another region is downloading or paused
    #[error("A download is already active for region {active}")]
    ConcurrentDownloadRejected { active: RegionId },

    #[error("No download is active")]
    NoActiveSession,

    #[error("Region {0} is being deleted")]
    RegionBlocked(RegionId),

    #[error("Region not found: {0}")]
    RegionNotFound(RegionId),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
