//! The offline manager: one object that owns the region registry, the tile
//! store, the downloader and the resolver, and exposes them as a single API.
//!
//! # Example
//!
//! ```ignore
//! use offgrid::config::OfflineConfig;
//! use offgrid::coord::{BoundingBox, GeoPoint, tile_at};
//! use offgrid::manager::OfflineManager;
//! use offgrid::region::NewRegion;
//! use offgrid::resolver::StaticReachability;
//! use std::sync::Arc;
//!
//! let reachability = Arc::new(StaticReachability::new(true));
//! let manager = OfflineManager::new(OfflineConfig::new("/tmp/offgrid"), reachability)?;
//!
//! let region = manager.add_region(NewRegion::new(
//!     "Valley",
//!     BoundingBox::new(46.60, 46.50, 8.10, 7.95),
//!     10,
//!     14,
//! ))?;
//! manager.start_download(&region.id)?;
//!
//! let point = GeoPoint::new(46.55, 8.0);
//! let png = manager.resolve(tile_at(point, 12), point).await;
//! ```

use crate::config::{ConfigFile, ConfigFileError, OfflineConfig};
use crate::coord::{GeoPoint, TileCoord};
use crate::download::{DownloadError, DownloadEvent, DownloadStatus, Downloader};
use crate::region::{NewRegion, Region, RegionId, RegionRegistry, RegistryError};
use crate::resolver::{Reachability, ResolvedTile, ResolverStats, TileResolver};
use crate::source::{
    AsyncReqwestClient, DefaultTileSource, FetchError, HttpTileSource, TileSource, UrlTemplate,
};
use crate::store::{StoreError, TileStore};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

/// Errors surfaced by [`OfflineManager`].
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The HTTP client behind the tile source could not be built
    #[error("Failed to create tile source: {0}")]
    Source(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error("Failed to build placeholder tile: {0}")]
    Placeholder(#[from] image::ImageError),
}

/// Offline map tile manager.
///
/// Built explicitly and shared by `Arc`; there is no global instance.
pub struct OfflineManager<S: TileSource + 'static = DefaultTileSource> {
    config: OfflineConfig,
    store: Arc<TileStore>,
    registry: Arc<RegionRegistry>,
    downloader: Downloader<S>,
    resolver: TileResolver<S>,
}

impl OfflineManager<DefaultTileSource> {
    /// Builds a manager that fetches from the configured XYZ server.
    pub fn new(
        config: OfflineConfig,
        reachability: Arc<dyn Reachability>,
    ) -> Result<Self, ManagerError> {
        let client =
            AsyncReqwestClient::with_options(&config.user_agent, config.download.timeout())?;
        let source = HttpTileSource::new(client, UrlTemplate::new(config.url_template.clone()));
        Self::with_source(config, Arc::new(source), reachability)
    }

    /// Builds a manager from an INI file; a missing file means defaults.
    pub fn from_config_file(
        path: &Path,
        reachability: Arc<dyn Reachability>,
    ) -> Result<Self, ManagerError> {
        let file = ConfigFile::load_from(path)?;
        Self::new(OfflineConfig::from(&file), reachability)
    }
}

impl<S: TileSource + 'static> OfflineManager<S> {
    /// Builds a manager around any tile source.
    ///
    /// Opens the store and the region index under `config.storage_dir`. A
    /// corrupt index does not fail construction; see
    /// [`load_recovery`](Self::load_recovery).
    pub fn with_source(
        config: OfflineConfig,
        source: Arc<S>,
        reachability: Arc<dyn Reachability>,
    ) -> Result<Self, ManagerError> {
        let store = Arc::new(TileStore::new(config.storage_dir.clone())?);
        let registry = Arc::new(RegionRegistry::load(
            config.index_path(),
            Arc::clone(&store),
        )?);

        let downloader = Downloader::new(
            Arc::clone(&source),
            Arc::clone(&store),
            Arc::clone(&registry),
            config.download,
        );
        let resolver = TileResolver::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            source,
            reachability,
            config.live_timeout,
        )?;

        info!(
            storage = %config.storage_dir.display(),
            regions = registry.len(),
            parallel_downloads = config.download.parallel_downloads(),
            "Offline manager ready"
        );

        Ok(Self {
            config,
            store,
            registry,
            downloader,
            resolver,
        })
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TileStore> {
        &self.store
    }

    /// The index corruption recovered from at startup, if any.
    pub fn load_recovery(&self) -> Option<&RegistryError> {
        self.registry.load_recovery()
    }

    // =========================================================================
    // Regions
    // =========================================================================

    pub fn add_region(&self, region: NewRegion) -> Result<Region, ManagerError> {
        Ok(self.registry.add(region)?)
    }

    pub fn update_region(&self, region: Region) -> Result<Region, ManagerError> {
        Ok(self.registry.update(region)?)
    }

    pub fn rename_region(
        &self,
        id: &RegionId,
        name: impl Into<String>,
    ) -> Result<Region, ManagerError> {
        Ok(self.registry.rename(id, name)?)
    }

    /// Deletes a region and its tiles.
    ///
    /// A session downloading this region is cancelled and drained first, so
    /// no fetch can write into the region after its files are removed. New
    /// downloads of the region are refused until the delete finishes.
    pub async fn delete_region(&self, id: &RegionId) -> Result<Region, ManagerError> {
        let _block = self.downloader.block_region(id);
        if self.downloader.cancel_region(id).await {
            info!(region = %id, "Cancelled active download before deleting region");
        }
        Ok(self.registry.delete(id).await?)
    }

    pub fn regions(&self) -> Vec<Region> {
        self.registry.list()
    }

    pub fn region(&self, id: &RegionId) -> Option<Region> {
        self.registry.get(id)
    }

    /// The complete region serving `point` at `zoom`, if any.
    pub fn find_region(&self, point: GeoPoint, zoom: u8) -> Option<Region> {
        self.registry.find(point, zoom)
    }

    // =========================================================================
    // Downloads
    // =========================================================================

    pub fn start_download(&self, id: &RegionId) -> Result<(), ManagerError> {
        Ok(self.downloader.start(id)?)
    }

    pub fn pause_download(&self) -> Result<(), ManagerError> {
        Ok(self.downloader.pause()?)
    }

    pub fn resume_download(&self) -> Result<(), ManagerError> {
        Ok(self.downloader.resume()?)
    }

    /// Cancels the active session and waits for in-flight fetches to drain.
    pub async fn cancel_download(&self) -> Result<DownloadStatus, ManagerError> {
        Ok(self.downloader.cancel().await?)
    }

    /// Waits for the current session to finish.
    pub async fn wait_for_download(&self) -> Option<DownloadStatus> {
        self.downloader.wait().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.downloader.subscribe()
    }

    pub fn status(&self) -> Option<DownloadStatus> {
        self.downloader.status()
    }

    pub fn is_downloading(&self) -> bool {
        self.downloader.is_active()
    }

    pub fn last_error(&self) -> Option<String> {
        self.downloader.last_error()
    }

    // =========================================================================
    // Serving
    // =========================================================================

    /// Resolves a tile to PNG bytes: cache, then network, then placeholder.
    pub async fn resolve(&self, tile: TileCoord, point: GeoPoint) -> Bytes {
        self.resolver.resolve(tile, point).await
    }

    pub async fn resolve_detailed(&self, tile: TileCoord, point: GeoPoint) -> ResolvedTile {
        self.resolver.resolve_detailed(tile, point).await
    }

    pub fn placeholder(&self) -> Bytes {
        self.resolver.placeholder()
    }

    pub fn resolver_stats(&self) -> ResolverStats {
        self.resolver.stats()
    }
}
