//! Filesystem implementation of the tile store.

use super::path::{region_directory, tile_path, TILE_EXTENSION};
use super::StoreError;
use crate::coord::TileCoord;
use bytes::Bytes;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Disk-backed tile store rooted at a base directory.
///
/// # Directory Structure
///
/// ```text
/// {base_dir}/{region_id}/tiles/{z}/{x}/{y}.png
/// ```
///
/// All operations go straight to the filesystem; nothing is indexed in
/// memory. Writes land in a temporary sibling first and are renamed into
/// place, so [`TileStore::exists`] never observes a half-written tile.
#[derive(Debug)]
pub struct TileStore {
    base_dir: PathBuf,
    /// Bytes written during this process lifetime.
    bytes_written: AtomicU64,
    /// Suffix counter for temporary files.
    tmp_counter: AtomicU64,
}

impl TileStore {
    /// Creates a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            bytes_written: AtomicU64::new(0),
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the bytes written to the store during this session.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Path of a tile inside a region's subtree.
    pub fn path(&self, region_id: &str, tile: &TileCoord) -> PathBuf {
        tile_path(&self.base_dir, region_id, tile)
    }

    /// Returns true if the tile is on disk.
    ///
    /// This is the authoritative answer to "is this tile downloaded".
    pub async fn exists(&self, region_id: &str, tile: &TileCoord) -> bool {
        let path = self.path(region_id, tile);
        matches!(tokio::fs::metadata(&path).await, Ok(meta) if meta.is_file())
    }

    /// Writes a tile, creating intermediate directories as needed.
    pub async fn write(
        &self,
        region_id: &str,
        tile: &TileCoord,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let path = self.path(region_id, tile);
        let write_err = |source: io::Error| StoreError::Write {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = self.temp_path(&path);
        if let Err(e) = tokio::fs::write(&tmp, data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        self.bytes_written
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        trace!(region = region_id, tile = %tile, bytes = data.len(), "Tile written");
        Ok(())
    }

    /// Reads a tile's bytes.
    pub async fn read(&self, region_id: &str, tile: &TileCoord) -> Result<Bytes, StoreError> {
        let path = self.path(region_id, tile);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(path)),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Recursively removes a region's subtree.
    ///
    /// Deleting a region that has nothing on disk is not an error.
    pub async fn delete(&self, region_id: &str) -> Result<(), StoreError> {
        let dir = region_directory(&self.base_dir, region_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(region = region_id, path = %dir.display(), "Region subtree deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Sum of tile file sizes under a region's subtree.
    pub async fn size(&self, region_id: &str) -> Result<u64, StoreError> {
        Ok(self.scan(region_id).await?.1)
    }

    /// Number of tile files under a region's subtree.
    pub async fn tile_count_on_disk(&self, region_id: &str) -> Result<u64, StoreError> {
        Ok(self.scan(region_id).await?.0)
    }

    /// Walks a region's subtree on the blocking pool, returning `(files, bytes)`.
    async fn scan(&self, region_id: &str) -> Result<(u64, u64), StoreError> {
        let dir = region_directory(&self.base_dir, region_id);
        tokio::task::spawn_blocking(move || scan_tiles_blocking(&dir))
            .await
            .map_err(|e| StoreError::Io(io::Error::other(e)))?
            .map_err(StoreError::Io)
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = path
            .file_name()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{}.tmp", std::process::id(), n));
        path.with_file_name(name)
    }
}

/// Recursively counts tile files and their sizes.
///
/// Leftover temporary files from an interrupted write are not counted.
fn scan_tiles_blocking(dir: &Path) -> io::Result<(u64, u64)> {
    let mut files = 0;
    let mut bytes = 0;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, 0)),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            let (f, b) = scan_tiles_blocking(&path)?;
            files += f;
            bytes += b;
        } else if path.extension().and_then(|s| s.to_str()) == Some(TILE_EXTENSION) {
            match entry.metadata() {
                Ok(meta) => {
                    files += 1;
                    bytes += meta.len();
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to stat tile");
                }
            }
        }
    }

    Ok((files, bytes))
}
