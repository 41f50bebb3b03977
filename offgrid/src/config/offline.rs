//! Runtime configuration for the offline manager.

use super::defaults::{DEFAULT_LIVE_TIMEOUT_SECS, DEFAULT_URL_TEMPLATE};
use super::file::ConfigFile;
use super::DownloadConfig;
use crate::region::INDEX_FILE_NAME;
use crate::source::DEFAULT_USER_AGENT;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything an [`OfflineManager`](crate::manager::OfflineManager) needs
/// to open its storage and talk to the tile server.
///
/// # Example
///
/// ```
/// use offgrid::config::OfflineConfig;
/// use std::time::Duration;
///
/// let config = OfflineConfig::new("/tmp/offgrid")
///     .with_url_template("https://tiles.example.com")
///     .with_live_timeout(Duration::from_secs(1));
/// assert!(config.index_path().ends_with("regions.json"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineConfig {
    pub storage_dir: PathBuf,
    pub url_template: String,
    pub user_agent: String,
    pub download: DownloadConfig,
    pub live_timeout: Duration,
}

impl OfflineConfig {
    /// Default server and download settings rooted at `storage_dir`.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            download: DownloadConfig::default(),
            live_timeout: Duration::from_secs(DEFAULT_LIVE_TIMEOUT_SECS),
        }
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    pub fn with_live_timeout(mut self, timeout: Duration) -> Self {
        self.live_timeout = timeout;
        self
    }

    /// Path of the region index inside the storage directory.
    pub fn index_path(&self) -> PathBuf {
        self.storage_dir.join(INDEX_FILE_NAME)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

impl From<&ConfigFile> for OfflineConfig {
    fn from(file: &ConfigFile) -> Self {
        Self::new(file.storage.directory.clone())
            .with_url_template(file.source.url_template.clone())
            .with_user_agent(file.source.user_agent.clone())
            .with_download(file.download_config())
            .with_live_timeout(Duration::from_secs(file.resolver.live_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OfflineConfig::new("/data");
        assert_eq!(config.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.download, DownloadConfig::default());
        assert_eq!(config.index_path(), PathBuf::from("/data/regions.json"));
    }

    #[test]
    fn test_from_config_file() {
        let mut file = ConfigFile::default();
        file.storage.directory = PathBuf::from("/mnt/sd/maps");
        file.source.url_template = "http://10.0.0.2/tiles".to_string();
        file.download.parallel_downloads = 2;
        file.resolver.live_timeout = 7;

        let config = OfflineConfig::from(&file);

        assert_eq!(config.storage_dir(), Path::new("/mnt/sd/maps"));
        assert_eq!(config.url_template, "http://10.0.0.2/tiles");
        assert_eq!(config.download.parallel_downloads(), 2);
        assert_eq!(config.live_timeout, Duration::from_secs(7));
    }
}
