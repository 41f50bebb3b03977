//! Region data model.

use crate::coord::{tile_count, BoundingBox, GeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Average stored tile size used for download size estimates.
pub const AVERAGE_TILE_SIZE_BYTES: u64 = 15 * 1024;

/// Stable identity of a region.
///
/// Rendered as a UUID string; it doubles as the region's directory name in
/// the tile store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Generates a fresh random identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RegionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-supplied description of a region, before identity is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegion {
    pub name: String,
    pub bbox: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl NewRegion {
    pub fn new(name: impl Into<String>, bbox: BoundingBox, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            name: name.into(),
            bbox,
            min_zoom,
            max_zoom,
        }
    }
}

/// A geographic area plus zoom range, the unit of offline download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub bbox: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation from the box and zoom range.
    pub total_tiles: u64,
    /// Tiles confirmed on disk, never above `total_tiles`.
    pub downloaded_tiles: u64,
    pub estimated_size_bytes: u64,
    /// Measured from disk once the region completes.
    #[serde(default)]
    pub actual_size_bytes: u64,
}

impl Region {
    /// Builds a region from its description, computing tile totals.
    pub(crate) fn from_new(new: NewRegion, id: RegionId, created_at: DateTime<Utc>) -> Self {
        let total_tiles = tile_count(&new.bbox, new.min_zoom, new.max_zoom);
        Self {
            id,
            name: new.name,
            bbox: new.bbox,
            min_zoom: new.min_zoom,
            max_zoom: new.max_zoom,
            created_at,
            total_tiles,
            downloaded_tiles: 0,
            estimated_size_bytes: total_tiles.saturating_mul(AVERAGE_TILE_SIZE_BYTES),
            actual_size_bytes: 0,
        }
    }

    /// True once every tile is on disk.
    pub fn is_complete(&self) -> bool {
        self.downloaded_tiles >= self.total_tiles
    }

    /// Fraction of tiles downloaded, 0.0 for an empty region.
    pub fn progress(&self) -> f64 {
        if self.total_tiles == 0 {
            return 0.0;
        }
        self.downloaded_tiles as f64 / self.total_tiles as f64
    }

    /// True if the zoom is inside this region's range.
    pub fn covers_zoom(&self, zoom: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
    }

    /// True if this region can serve `point` at `zoom` from the offline cache.
    pub fn serves(&self, point: GeoPoint, zoom: u8) -> bool {
        self.is_complete() && self.covers_zoom(zoom) && self.bbox.contains(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(total: u64, downloaded: u64) -> Region {
        let mut r = Region::from_new(
            NewRegion::new("test", BoundingBox::new(1.0, 0.0, 1.0, 0.0), 5, 6),
            RegionId::from("id"),
            Utc::now(),
        );
        r.total_tiles = total;
        r.downloaded_tiles = downloaded;
        r
    }

    #[test]
    fn test_from_new_computes_totals() {
        let bbox = BoundingBox::new(0.005, -0.005, 0.005, -0.005);
        let r = Region::from_new(
            NewRegion::new("square", bbox, 14, 14),
            RegionId::generate(),
            Utc::now(),
        );
        assert_eq!(r.total_tiles, 4);
        assert_eq!(r.downloaded_tiles, 0);
        assert_eq!(r.estimated_size_bytes, 4 * AVERAGE_TILE_SIZE_BYTES);
        assert_eq!(r.actual_size_bytes, 0);
    }

    #[test]
    fn test_progress_and_completion() {
        assert_eq!(region(4, 0).progress(), 0.0);
        assert_eq!(region(4, 2).progress(), 0.5);
        assert!(!region(4, 3).is_complete());
        assert!(region(4, 4).is_complete());
        assert_eq!(region(4, 4).progress(), 1.0);
    }

    #[test]
    fn test_progress_guards_empty_region() {
        assert_eq!(region(0, 0).progress(), 0.0);
    }

    #[test]
    fn test_serves_requires_completion_zoom_and_point() {
        let r = region(1, 1);
        let inside = GeoPoint::new(0.5, 0.5);
        assert!(r.serves(inside, 5));
        assert!(r.serves(inside, 6));
        assert!(!r.serves(inside, 7));
        assert!(!r.serves(GeoPoint::new(2.0, 0.5), 5));
        assert!(!region(2, 1).serves(inside, 5));
    }

    #[test]
    fn test_region_id_generate_is_unique() {
        assert_ne!(RegionId::generate(), RegionId::generate());
    }

    #[test]
    fn test_region_serde_round_trip_keeps_id_as_string() {
        let r = region(3, 1);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"id\":\"id\""));
        let back: Region = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
