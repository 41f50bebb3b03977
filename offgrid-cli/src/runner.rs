//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and manager creation
//! to reduce duplication across command handlers.

use crate::error::CliError;
use offgrid::config::{config_file_path, ConfigFile, OfflineConfig};
use offgrid::logging::{default_log_file, init_logging_full, LoggingGuard};
use offgrid::manager::OfflineManager;
use offgrid::resolver::StaticReachability;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to read; `~/.offgrid/config.ini` when None
    /// * `verbose` - Mirror logs to stderr at debug level
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging_full(&log_dir, &log_file, verbose, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("offgrid v{}", offgrid::VERSION);
        info!("offgrid CLI: {} command", command);
    }

    /// Build the manager from the loaded configuration.
    ///
    /// `online` seeds the reachability flag the resolver consults.
    pub fn create_manager(&self, online: bool) -> Result<OfflineManager, CliError> {
        let reachability = Arc::new(StaticReachability::new(online));
        let manager = OfflineManager::new(OfflineConfig::from(&self.config), reachability)?;

        if let Some(recovered) = manager.load_recovery() {
            warn!(error = %recovered, "Started with an empty region index");
            eprintln!("Warning: {}", recovered);
            eprintln!("The damaged index was moved aside; regions must be re-added.");
        }
        Ok(manager)
    }
}

/// Load the config file at `path`, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(ConfigFile::load_from(&path)?)
}
