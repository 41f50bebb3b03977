//! Session state, status snapshots and events.

use crate::region::RegionId;
use std::fmt;

/// Download session state.
///
/// ```text
/// Idle -> Downloading <-> Paused -> { Completed, Cancelled, Failed }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DownloadState {
    /// Accepted but not yet scanned.
    #[default]
    Idle,

    /// Fetching tiles.
    Downloading,

    /// No new fetches dispatched and in-flight fetches drained.
    Paused,

    /// Every tile of the region is on disk.
    Completed,

    /// Stopped by the user; written tiles remain.
    Cancelled,

    /// Finished with tiles that exhausted their retries.
    Failed,
}

impl DownloadState {
    /// Returns true if the session has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns true while the session occupies the downloader.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Downloading => write!(f, "Downloading"),
            Self::Paused => write!(f, "Paused"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadStatus {
    pub region_id: RegionId,
    pub state: DownloadState,
    /// Tiles confirmed on disk, including those present before the session.
    pub downloaded: u64,
    pub total: u64,
    /// Tiles that exhausted their retries since the last (re)scan.
    pub failed: u64,
    /// Fetches currently running.
    pub in_flight: usize,
}

impl DownloadStatus {
    pub(crate) fn new(region_id: RegionId, total: u64) -> Self {
        Self {
            region_id,
            state: DownloadState::Idle,
            downloaded: 0,
            total,
            failed: 0,
            in_flight: 0,
        }
    }

    /// Fraction of tiles on disk, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.downloaded as f64 / self.total as f64
    }
}

/// Events published by the downloader.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Started {
        region_id: RegionId,
        total: u64,
        /// Tiles found on disk and skipped.
        already_downloaded: u64,
    },
    /// Published after every tile resolves, successfully or not.
    Progress {
        region_id: RegionId,
        downloaded: u64,
        total: u64,
        failed: u64,
        progress: f64,
    },
    Paused {
        region_id: RegionId,
    },
    Resumed {
        region_id: RegionId,
        downloaded: u64,
    },
    Completed {
        region_id: RegionId,
        actual_size_bytes: u64,
    },
    Cancelled {
        region_id: RegionId,
    },
    Failed {
        region_id: RegionId,
        failed_tile_count: u64,
    },
}

impl DownloadEvent {
    /// The region this event belongs to.
    pub fn region_id(&self) -> &RegionId {
        match self {
            Self::Started { region_id, .. }
            | Self::Progress { region_id, .. }
            | Self::Paused { region_id }
            | Self::Resumed { region_id, .. }
            | Self::Completed { region_id, .. }
            | Self::Cancelled { region_id }
            | Self::Failed { region_id, .. } => region_id,
        }
    }

    /// Returns true for the event that ends a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }
}
