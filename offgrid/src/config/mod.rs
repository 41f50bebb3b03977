//! Configuration for offgrid.
//!
//! Two layers:
//!
//! - [`ConfigFile`]: the user's `~/.offgrid/config.ini`, one struct per
//!   INI section, with defaults for anything missing.
//! - [`OfflineConfig`] and [`DownloadConfig`]: the runtime values the
//!   manager and downloader are built from.
//!
//! # Example
//!
//! ```
//! use offgrid::config::{ConfigFile, OfflineConfig};
//!
//! let file = ConfigFile::default();
//! let config = OfflineConfig::from(&file);
//! assert_eq!(config.download.max_retries(), 3);
//! ```

mod defaults;
mod download;
mod file;
mod offline;
mod parser;
mod settings;
mod size;
mod writer;

pub use download::DownloadConfig;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use offline::OfflineConfig;
pub use size::format_size;

pub use defaults::*;
pub use settings::*;
