//! offgrid - Offline map tile cache and region download manager
//!
//! This library turns a geographic area and a zoom range into a fixed set of
//! Web Mercator tiles, downloads them to disk with pause, resume and
//! cancellation, and serves tile requests offline-first with a live
//! fallback and a placeholder of last resort.
//!
//! # High-Level API
//!
//! The [`manager`] module composes everything behind one facade:
//!
//! ```ignore
//! use offgrid::config::OfflineConfig;
//! use offgrid::manager::OfflineManager;
//! use offgrid::resolver::StaticReachability;
//! use std::sync::Arc;
//!
//! let reachability = Arc::new(StaticReachability::new(true));
//! let manager = OfflineManager::new(OfflineConfig::new(storage_dir), reachability)?;
//! let mut events = manager.subscribe();
//! manager.start_download(&region_id)?;
//! ```

pub mod config;
pub mod coord;
pub mod download;
pub mod logging;
pub mod manager;
pub mod region;
pub mod resolver;
pub mod source;
pub mod store;

/// Version of the offgrid library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
