//! Region download configuration.

use super::file::{
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_PARALLEL_DOWNLOADS,
    DEFAULT_RETRY_BASE_DELAY_MS,
};
use std::time::Duration;

/// Configuration for region downloads.
///
/// # Example
///
/// ```
/// use offgrid::config::DownloadConfig;
/// use std::time::Duration;
///
/// // Using defaults
/// let config = DownloadConfig::default();
/// assert_eq!(config.timeout(), Duration::from_secs(10));
/// assert_eq!(config.max_retries(), 3);
/// assert_eq!(config.parallel_downloads(), 4);
///
/// // Custom configuration
/// let config = DownloadConfig::new()
///     .with_timeout_secs(30)
///     .with_max_retries(5)
///     .with_parallel_downloads(8);
/// assert_eq!(config.parallel_downloads(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Maximum time for a single tile fetch
    timeout: Duration,
    /// Retries after the first failed attempt of a tile
    max_retries: u32,
    /// Maximum number of concurrent fetches
    parallel_downloads: usize,
    /// Backoff before retry `n` is `retry_base_delay * 2^n`
    retry_base_delay: Duration,
}

impl DownloadConfig {
    /// Create a new download configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-tile fetch timeout in seconds. Default: 10 seconds.
    pub fn with_timeout_secs(self, timeout: u64) -> Self {
        self.with_timeout(Duration::from_secs(timeout))
    }

    /// Set the per-tile fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries per tile.
    ///
    /// A tile that keeps failing is attempted `1 + max_retries` times before
    /// it is recorded as failed. Default: 3 retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the maximum number of parallel fetches.
    ///
    /// Values below 1 are raised to 1. Default: 4.
    pub fn with_parallel_downloads(mut self, parallel: usize) -> Self {
        self.parallel_downloads = parallel.max(1);
        self
    }

    /// Set the base retry delay in milliseconds. Default: 250 ms.
    pub fn with_retry_base_delay_ms(mut self, millis: u64) -> Self {
        self.retry_base_delay = Duration::from_millis(millis);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn parallel_downloads(&self) -> usize {
        self.parallel_downloads
    }

    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    /// Backoff to sleep after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            parallel_downloads: DEFAULT_PARALLEL_DOWNLOADS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}
