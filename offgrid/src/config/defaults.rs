//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::source::DEFAULT_USER_AGENT;

// =============================================================================
// Source defaults
// =============================================================================

/// Default live tile server.
pub const DEFAULT_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

// =============================================================================
// Download defaults
// =============================================================================

/// Default per-tile fetch timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 10;

/// Default retries per tile after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of concurrent tile fetches.
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = 4;

/// Default retry backoff base delay in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

// =============================================================================
// Resolver defaults
// =============================================================================

/// Default live fetch timeout for the resolver, in seconds.
pub const DEFAULT_LIVE_TIMEOUT_SECS: u64 = 3;

/// Name of the log file inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "offgrid.log";

/// Default storage directory (`<platform cache dir>/offgrid`).
pub fn default_storage_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("offgrid")
}

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            storage: StorageSettings {
                directory: default_storage_directory(),
            },
            source: SourceSettings {
                url_template: DEFAULT_URL_TEMPLATE.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            download: DownloadSettings {
                parallel_downloads: DEFAULT_PARALLEL_DOWNLOADS,
                max_retries: DEFAULT_MAX_RETRIES,
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
                retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            },
            resolver: ResolverSettings {
                live_timeout: DEFAULT_LIVE_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                file: config_dir.join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
