//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub source: SourceSettings,
    pub download: DownloadSettings,
    pub resolver: ResolverSettings,
    pub logging: LoggingSettings,
}

/// Where regions and tiles live on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Holds `regions.json` and one subtree per region
    pub directory: PathBuf,
}

/// Live tile server.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// XYZ template with `{z}`, `{x}`, `{y}`, or a base URL
    pub url_template: String,
    pub user_agent: String,
}

/// Region download behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub parallel_downloads: usize,
    pub max_retries: u32,
    /// Per-tile fetch timeout in seconds
    pub timeout: u64,
    /// Backoff base; retry `n` waits `retry_base_delay_ms * 2^n`
    pub retry_base_delay_ms: u64,
}

/// Tile serving.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// Live fetch timeout in seconds for cache misses
    pub live_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
