//! Tile path construction.
//!
//! The layout is part of the on-disk format: nothing persists absolute paths,
//! so every tile is located by recomputing its path from the region id and
//! tile coordinate. Changing it orphans every previously downloaded region.

use crate::coord::TileCoord;
use std::path::{Path, PathBuf};

/// File extension of stored tiles.
pub const TILE_EXTENSION: &str = "png";

/// Directory name under a region that holds its tile pyramid.
pub const TILES_DIR: &str = "tiles";

/// Construct the full path for a stored tile.
///
/// ```text
/// <base_dir>/<region_id>/tiles/<z>/<x>/<y>.png
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use offgrid::coord::TileCoord;
/// use offgrid::store::tile_path;
///
/// let base = PathBuf::from("/cache");
/// let tile = TileCoord { x: 8192, y: 5461, z: 14 };
/// let path = tile_path(&base, "a1b2", &tile);
///
/// assert_eq!(path, PathBuf::from("/cache/a1b2/tiles/14/8192/5461.png"));
/// ```
pub fn tile_path(base_dir: &Path, region_id: &str, tile: &TileCoord) -> PathBuf {
    region_directory(base_dir, region_id)
        .join(TILES_DIR)
        .join(tile.z.to_string())
        .join(tile.x.to_string())
        .join(format!("{}.{}", tile.y, TILE_EXTENSION))
}

/// Get the root directory of a region's subtree.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use offgrid::store::region_directory;
///
/// let dir = region_directory(&PathBuf::from("/cache"), "a1b2");
/// assert_eq!(dir, PathBuf::from("/cache/a1b2"));
/// ```
pub fn region_directory(base_dir: &Path, region_id: &str) -> PathBuf {
    base_dir.join(region_id)
}
