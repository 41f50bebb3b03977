//! Tile serving with offline-first fallback.
//!
//! [`TileResolver::resolve`] answers every tile request with bytes:
//!
//! 1. **Cache**: a completed region covering the point at this zoom, with
//!    the tile on disk.
//! 2. **Network**: the live source, when reachability says it is worth
//!    trying, under a short timeout. Network tiles are not written to any
//!    region.
//! 3. **Placeholder**: a gray "no data" tile.
//!
//! Errors on the way down are logged and swallowed; the caller never sees
//! one.

mod placeholder;
mod reachability;

pub use placeholder::{generate_default_placeholder, generate_placeholder, PLACEHOLDER_SIZE};
pub use reachability::{Reachability, StaticReachability};

use crate::coord::{GeoPoint, TileCoord};
use crate::region::RegionRegistry;
use crate::source::{FetchError, TileSource};
use crate::store::TileStore;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Where a resolved tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrigin {
    Cache,
    Network,
    Placeholder,
}

/// A resolved tile and its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTile {
    pub data: Bytes,
    pub origin: TileOrigin,
}

/// Per-origin resolve counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache: u64,
    pub network: u64,
    pub placeholder: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache: AtomicU64,
    network: AtomicU64,
    placeholder: AtomicU64,
}

/// Three-tier tile resolver.
pub struct TileResolver<S: TileSource> {
    registry: Arc<RegionRegistry>,
    store: Arc<TileStore>,
    source: Arc<S>,
    reachability: Arc<dyn Reachability>,
    live_timeout: Duration,
    placeholder: Bytes,
    counters: Counters,
}

impl<S: TileSource> TileResolver<S> {
    /// Creates a resolver, encoding the placeholder once up front.
    pub fn new(
        registry: Arc<RegionRegistry>,
        store: Arc<TileStore>,
        source: Arc<S>,
        reachability: Arc<dyn Reachability>,
        live_timeout: Duration,
    ) -> Result<Self, image::ImageError> {
        let placeholder = Bytes::from(generate_default_placeholder()?);
        Ok(Self {
            registry,
            store,
            source,
            reachability,
            live_timeout,
            placeholder,
            counters: Counters::default(),
        })
    }

    /// Resolves a tile to bytes. Never fails.
    ///
    /// `point` selects the region; it is normally inside the tile.
    pub async fn resolve(&self, tile: TileCoord, point: GeoPoint) -> Bytes {
        self.resolve_detailed(tile, point).await.data
    }

    /// Resolves a tile, reporting which tier answered.
    pub async fn resolve_detailed(&self, tile: TileCoord, point: GeoPoint) -> ResolvedTile {
        if !tile.is_valid() {
            debug!(tile = %tile, "Tile outside the grid, serving placeholder");
            return self.placeholder_tile();
        }

        if let Some(data) = self.from_cache(&tile, point).await {
            self.counters.cache.fetch_add(1, Ordering::Relaxed);
            return ResolvedTile {
                data,
                origin: TileOrigin::Cache,
            };
        }

        if self.reachability.is_reachable() {
            match self.from_network(tile).await {
                Ok(data) => {
                    self.counters.network.fetch_add(1, Ordering::Relaxed);
                    return ResolvedTile {
                        data,
                        origin: TileOrigin::Network,
                    };
                }
                Err(e) => {
                    debug!(tile = %tile, error = %e, "Live fetch failed, serving placeholder");
                }
            }
        }

        self.placeholder_tile()
    }

    /// The placeholder payload.
    pub fn placeholder(&self) -> Bytes {
        self.placeholder.clone()
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            cache: self.counters.cache.load(Ordering::Relaxed),
            network: self.counters.network.load(Ordering::Relaxed),
            placeholder: self.counters.placeholder.load(Ordering::Relaxed),
        }
    }

    async fn from_cache(&self, tile: &TileCoord, point: GeoPoint) -> Option<Bytes> {
        let region = self.registry.find(point, tile.z)?;
        let region_id = region.id.as_str();

        if !self.store.exists(region_id, tile).await {
            return None;
        }
        match self.store.read(region_id, tile).await {
            Ok(data) => {
                trace!(tile = %tile, region = region_id, "Served from offline cache");
                Some(data)
            }
            Err(e) => {
                debug!(tile = %tile, region = region_id, error = %e, "Cached tile unreadable");
                None
            }
        }
    }

    async fn from_network(&self, tile: TileCoord) -> Result<Bytes, FetchError> {
        let data = tokio::time::timeout(self.live_timeout, self.source.fetch(tile))
            .await
            .map_err(|_| FetchError::Timeout)??;
        trace!(tile = %tile, bytes = data.len(), "Served from live source");
        Ok(Bytes::from(data))
    }

    fn placeholder_tile(&self) -> ResolvedTile {
        self.counters.placeholder.fetch_add(1, Ordering::Relaxed);
        ResolvedTile {
            data: self.placeholder.clone(),
            origin: TileOrigin::Placeholder,
        }
    }
}
