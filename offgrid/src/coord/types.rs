//! Coordinate type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range (the east edge is exclusive for tile math)
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile coordinates in the Web Mercator / slippy-map scheme.
///
/// `x` grows eastwards from the antimeridian, `y` grows southwards from the
/// northern edge of the projection. Both are in `[0, 2^z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub z: u8,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate, validating the zoom level and grid bounds.
    pub fn new(x: u32, y: u32, z: u8) -> Result<Self, CoordError> {
        if z > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(z));
        }
        let n = grid_size(z);
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(CoordError::OutOfGrid { x, y, z });
        }
        Ok(Self { x, y, z })
    }

    /// Returns true if the coordinate lies inside the `2^z × 2^z` grid.
    pub fn is_valid(&self) -> bool {
        Self::new(self.x, self.y, self.z).is_ok()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Number of tiles along one axis at `zoom`, saturating at `u64::MAX`.
#[inline]
pub(crate) fn grid_size(zoom: u8) -> u64 {
    1u64.checked_shl(u32::from(zoom)).unwrap_or(u64::MAX)
}

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks the point lies inside the Web Mercator range.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&self.lat) {
            return Err(CoordError::InvalidLatitude(self.lat));
        }
        if !(MIN_LON..MAX_LON).contains(&self.lon) {
            return Err(CoordError::InvalidLongitude(self.lon));
        }
        Ok(())
    }
}

/// Geographic rectangle in decimal degrees.
///
/// A box is well-formed when `north >= south` and `east >= west`. Boxes that
/// cross the antimeridian (`west > east`) are not supported and are treated as
/// inverted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its edges.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Creates a bounding box from a center point and full lat/lon spans.
    pub fn from_center_span(center: GeoPoint, lat_span: f64, lon_span: f64) -> Self {
        let half_lat = lat_span / 2.0;
        let half_lon = lon_span / 2.0;
        Self {
            north: center.lat + half_lat,
            south: center.lat - half_lat,
            east: center.lon + half_lon,
            west: center.lon - half_lon,
        }
    }

    /// North-west corner.
    pub fn north_west(&self) -> GeoPoint {
        GeoPoint::new(self.north, self.west)
    }

    /// South-east corner.
    pub fn south_east(&self) -> GeoPoint {
        GeoPoint::new(self.south, self.east)
    }

    /// Center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Returns true if every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Returns true if the corners are inverted on either axis.
    pub fn is_inverted(&self) -> bool {
        self.north < self.south || self.east < self.west
    }

    /// Inclusive containment test on all four edges.
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat <= self.north
            && point.lat >= self.south
            && point.lon >= self.west
            && point.lon <= self.east
    }

    /// Checks that the box is well-formed and inside the projection's domain.
    ///
    /// The east edge must stay strictly below 180° so that every corner maps
    /// to a tile inside the grid.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !self.is_finite() {
            return Err(CoordError::InvertedBoundingBox);
        }
        if self.is_inverted() {
            return Err(CoordError::InvertedBoundingBox);
        }
        for lat in [self.north, self.south] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [self.west, self.east] {
            if !(MIN_LON..MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        Ok(())
    }
}

/// Errors that can occur when validating coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside the Web Mercator range
    InvalidLatitude(f64),
    /// Longitude is outside [-180, 180)
    InvalidLongitude(f64),
    /// Zoom level is above MAX_ZOOM
    InvalidZoom(u8),
    /// Tile coordinate does not fit in the grid for its zoom
    OutOfGrid { x: u32, y: u32, z: u8 },
    /// Bounding box corners are inverted (or not finite)
    InvertedBoundingBox,
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be in [{}, {}))",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::OutOfGrid { x, y, z } => {
                write!(f, "Tile {}/{}/{} is outside the zoom {} grid", z, x, y, z)
            }
            CoordError::InvertedBoundingBox => {
                write!(f, "Bounding box corners are inverted or not finite")
            }
        }
    }
}

impl std::error::Error for CoordError {}
