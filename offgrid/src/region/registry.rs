//! Region registry with JSON index persistence.

use super::types::{NewRegion, Region, RegionId};
use super::RegistryError;
use crate::coord::{GeoPoint, MAX_ZOOM};
use crate::store::TileStore;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the index file under the storage directory.
pub const INDEX_FILE_NAME: &str = "regions.json";

/// Suffix appended to an index file that failed to parse.
const CORRUPT_SUFFIX: &str = "corrupt";

/// Current index format version.
const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    regions: Vec<Region>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    regions: &'a [Region],
}

/// Registry of offline regions.
///
/// The ordered region list lives in memory behind a mutex and is rewritten
/// in full to the index file on every mutation. The write happens while the
/// lock is held, so the file always reflects the latest committed state and
/// a failed write leaves the in-memory list untouched.
pub struct RegionRegistry {
    index_path: PathBuf,
    store: Arc<TileStore>,
    regions: Mutex<Vec<Region>>,
    load_recovery: Option<RegistryError>,
}

impl RegionRegistry {
    /// Loads the registry from `index_path`.
    ///
    /// A missing file yields an empty registry. A file that cannot be parsed
    /// is moved aside to `<index>.corrupt` and the registry starts empty; the
    /// parse error is kept and exposed by [`load_recovery`](Self::load_recovery).
    pub fn load(index_path: impl Into<PathBuf>, store: Arc<TileStore>) -> Result<Self, RegistryError> {
        let index_path = index_path.into();
        if let Some(parent) = index_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (regions, load_recovery) = match fs::read(&index_path) {
            Ok(content) => match serde_json::from_slice::<IndexFile>(&content) {
                Ok(index) => {
                    info!(
                        path = %index_path.display(),
                        regions = index.regions.len(),
                        "Region index loaded"
                    );
                    (index.regions, None)
                }
                Err(e) => {
                    let error = RegistryError::RegionIndexCorrupt {
                        path: index_path.clone(),
                        reason: e.to_string(),
                    };
                    let moved_to = set_aside(&index_path);
                    warn!(
                        path = %index_path.display(),
                        moved_to = ?moved_to,
                        error = %e,
                        "Region index is corrupt, starting with an empty registry"
                    );
                    (Vec::new(), Some(error))
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %index_path.display(), "No region index, starting empty");
                (Vec::new(), None)
            }
            Err(e) => return Err(RegistryError::Io(e)),
        };

        Ok(Self {
            index_path,
            store,
            regions: Mutex::new(regions),
            load_recovery,
        })
    }

    /// Path of the index file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// The tile store holding this registry's region subtrees.
    pub fn store(&self) -> &Arc<TileStore> {
        &self.store
    }

    /// The corruption error recovered from at load time, if any.
    pub fn load_recovery(&self) -> Option<&RegistryError> {
        self.load_recovery.as_ref()
    }

    /// Registers a new region and persists the index.
    pub fn add(&self, new: NewRegion) -> Result<Region, RegistryError> {
        validate(&new)?;
        let region = Region::from_new(new, RegionId::generate(), Utc::now());

        self.mutate(|regions| {
            regions.push(region.clone());
            Ok(())
        })?;

        info!(
            region = %region.id,
            name = %region.name,
            total_tiles = region.total_tiles,
            zooms = %format!("{}-{}", region.min_zoom, region.max_zoom),
            "Region added"
        );
        Ok(region)
    }

    /// Replaces a region by identity.
    ///
    /// Tile totals are fixed at creation, so the stored `total_tiles` and
    /// `estimated_size_bytes` win over the supplied values. The box and zoom
    /// range they were computed from cannot change either; an update that
    /// moves them is rejected with [`RegistryError::InvalidRegion`].
    pub fn update(&self, region: Region) -> Result<Region, RegistryError> {
        let id = region.id.clone();
        self.try_modify(&id, move |stored| {
            if stored.bbox != region.bbox
                || stored.min_zoom != region.min_zoom
                || stored.max_zoom != region.max_zoom
            {
                return Err(RegistryError::InvalidRegion(
                    "bounding box and zoom range are fixed at creation".into(),
                ));
            }
            let total_tiles = stored.total_tiles;
            let estimated = stored.estimated_size_bytes;
            *stored = region;
            stored.total_tiles = total_tiles;
            stored.estimated_size_bytes = estimated;
            stored.downloaded_tiles = stored.downloaded_tiles.min(total_tiles);
            Ok(())
        })
    }

    /// Changes a region's display name.
    pub fn rename(&self, id: &RegionId, name: impl Into<String>) -> Result<Region, RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidRegion("name must not be empty".into()));
        }
        self.modify(id, move |stored| stored.name = name)
    }

    /// Records the number of tiles confirmed on disk, clamped to the total.
    pub fn set_downloaded(&self, id: &RegionId, downloaded: u64) -> Result<Region, RegistryError> {
        self.modify(id, |stored| {
            stored.downloaded_tiles = downloaded.min(stored.total_tiles);
        })
    }

    /// Records the measured on-disk size.
    pub fn set_actual_size(&self, id: &RegionId, bytes: u64) -> Result<Region, RegistryError> {
        self.modify(id, |stored| stored.actual_size_bytes = bytes)
    }

    /// Removes a region and deletes its tiles from disk.
    ///
    /// The region leaves the index before any file is touched, so a lookup
    /// never finds a region whose tiles are being removed.
    pub async fn delete(&self, id: &RegionId) -> Result<Region, RegistryError> {
        let mut removed = None;
        self.mutate(|regions| {
            let pos = regions
                .iter()
                .position(|r| &r.id == id)
                .ok_or_else(|| RegistryError::RegionNotFound(id.clone()))?;
            removed = Some(regions.remove(pos));
            Ok(())
        })?;
        let removed = removed.ok_or_else(|| RegistryError::RegionNotFound(id.clone()))?;

        self.store.delete(id.as_str()).await?;
        info!(region = %id, name = %removed.name, "Region deleted");
        Ok(removed)
    }

    /// Looks up a region by identity.
    pub fn get(&self, id: &RegionId) -> Option<Region> {
        self.regions.lock().iter().find(|r| &r.id == id).cloned()
    }

    /// All regions in insertion order.
    pub fn list(&self) -> Vec<Region> {
        self.regions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.regions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.lock().is_empty()
    }

    /// First complete region, in insertion order, serving `point` at `zoom`.
    pub fn find(&self, point: GeoPoint, zoom: u8) -> Option<Region> {
        self.regions
            .lock()
            .iter()
            .find(|r| r.serves(point, zoom))
            .cloned()
    }

    /// Applies `f` to the region with `id` and persists.
    fn modify<F>(&self, id: &RegionId, f: F) -> Result<Region, RegistryError>
    where
        F: FnOnce(&mut Region),
    {
        self.try_modify(id, |stored| {
            f(stored);
            Ok(())
        })
    }

    /// Like [`modify`](Self::modify), but `f` may veto the change.
    fn try_modify<F>(&self, id: &RegionId, f: F) -> Result<Region, RegistryError>
    where
        F: FnOnce(&mut Region) -> Result<(), RegistryError>,
    {
        let mut updated = None;
        self.mutate(|regions| {
            let stored = regions
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| RegistryError::RegionNotFound(id.clone()))?;
            f(stored)?;
            updated = Some(stored.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| RegistryError::RegionNotFound(id.clone()))
    }

    /// Runs `f` on a copy of the list, persists it, then commits.
    fn mutate<F>(&self, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut Vec<Region>) -> Result<(), RegistryError>,
    {
        let mut guard = self.regions.lock();
        let mut next = guard.clone();
        f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, regions: &[Region]) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&IndexFileRef {
            version: INDEX_VERSION,
            regions,
        })?;

        let tmp = self.index_path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.index_path) {
            let _ = fs::remove_file(&tmp);
            return Err(RegistryError::Io(e));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RegionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRegistry")
            .field("index_path", &self.index_path)
            .field("regions", &self.len())
            .finish()
    }
}

fn validate(new: &NewRegion) -> Result<(), RegistryError> {
    if new.name.trim().is_empty() {
        return Err(RegistryError::InvalidRegion("name must not be empty".into()));
    }
    if new.min_zoom > new.max_zoom {
        return Err(RegistryError::InvalidRegion(format!(
            "min zoom {} is above max zoom {}",
            new.min_zoom, new.max_zoom
        )));
    }
    if new.max_zoom > MAX_ZOOM {
        return Err(RegistryError::InvalidRegion(format!(
            "max zoom {} exceeds {}",
            new.max_zoom, MAX_ZOOM
        )));
    }
    new.bbox
        .validate()
        .map_err(|e| RegistryError::InvalidRegion(e.to_string()))
}

/// Moves a corrupt index out of the way, returning where it went.
fn set_aside(index_path: &Path) -> Option<PathBuf> {
    let mut name = index_path.file_name()?.to_os_string();
    name.push(".");
    name.push(CORRUPT_SUFFIX);
    let target = index_path.with_file_name(name);
    match fs::rename(index_path, &target) {
        Ok(()) => Some(target),
        Err(e) => {
            warn!(path = %index_path.display(), error = %e, "Could not move corrupt index aside");
            None
        }
    }
}
