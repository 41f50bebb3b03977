//! Tile math.
//!
//! Conversions between geographic coordinates (latitude/longitude) and Web
//! Mercator tile coordinates, plus deterministic enumeration of the tiles
//! covering a bounding box over a zoom range.
//!
//! # Domain
//!
//! The projection is defined for latitudes in `(-85.0511°, 85.0511°)` and
//! longitudes in `[-180°, 180°)`. [`tile_for_point`] performs no validation:
//! outside that domain its result is undefined. The float-to-integer cast
//! saturates, so such inputs may yield coordinates outside `[0, 2^z)`; callers
//! that accept user input validate with [`BoundingBox::validate`] or
//! [`TileCoord::new`] first.

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    BoundingBox, CoordError, GeoPoint, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;
use types::grid_size;

/// Converts geographic coordinates to tile `(x, y)` at `zoom`.
///
/// Never panics. Zooms above [`MAX_ZOOM`] are outside the supported domain
/// and give saturated coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 inclusive to 180.0 exclusive)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn tile_for_point(lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
    let n = grid_size(zoom) as f64;

    let x = ((lon + 180.0) / 360.0 * n).floor() as u32;

    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as u32;

    (x, y)
}

/// Returns the tile containing `point` at `zoom`.
///
/// Same domain caveats as [`tile_for_point`].
#[inline]
pub fn tile_at(point: GeoPoint, zoom: u8) -> TileCoord {
    let (x, y) = tile_for_point(point.lat, point.lon, zoom);
    TileCoord { x, y, z: zoom }
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    corner_lat_lon(tile.x, tile.y, tile.z)
}

fn corner_lat_lon(x: u32, y: u32, zoom: u8) -> (f64, f64) {
    let n = grid_size(zoom) as f64;

    let lon = x as f64 / n * 360.0 - 180.0;

    let y = y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Geographic extent of a tile.
pub fn tile_bounds(tile: &TileCoord) -> BoundingBox {
    let (north, west) = corner_lat_lon(tile.x, tile.y, tile.z);
    let (south, east) = corner_lat_lon(tile.x.saturating_add(1), tile.y.saturating_add(1), tile.z);
    BoundingBox::new(north, south, east, west)
}

/// Tile rectangle `(min_x, max_x, min_y, max_y)` covering `bbox` at `zoom`,
/// clamped to the grid.
///
/// `None` when the box is inverted or not finite, or when `zoom` is above
/// [`MAX_ZOOM`].
fn tile_rect(bbox: &BoundingBox, zoom: u8) -> Option<(u32, u32, u32, u32)> {
    if zoom > MAX_ZOOM || !bbox.is_finite() || bbox.is_inverted() {
        return None;
    }
    let last = (grid_size(zoom) - 1) as u32;
    let (min_x, min_y) = tile_for_point(bbox.north, bbox.west, zoom);
    let (max_x, max_y) = tile_for_point(bbox.south, bbox.east, zoom);
    let (min_x, max_x) = (min_x.min(last), max_x.min(last));
    let (min_y, max_y) = (min_y.min(last), max_y.min(last));
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some((min_x, max_x, min_y, max_y))
}

/// Enumerates every tile covering `bbox` at `zoom`.
///
/// Tiles come out x-major (all rows of the westmost column first). The result
/// is empty when the corners invert or `zoom` is above [`MAX_ZOOM`].
pub fn tiles_for_bbox(bbox: &BoundingBox, zoom: u8) -> Vec<TileCoord> {
    let Some((min_x, max_x, min_y, max_y)) = tile_rect(bbox, zoom) else {
        return Vec::new();
    };

    let count = u64::from(max_x - min_x + 1) * u64::from(max_y - min_y + 1);
    let mut tiles = Vec::with_capacity(count as usize);
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            tiles.push(TileCoord { x, y, z: zoom });
        }
    }
    tiles
}

/// Number of tiles covering `bbox` for every zoom in `[min_zoom, max_zoom]`.
///
/// `min_zoom > max_zoom` yields 0 by contract. Zooms above [`MAX_ZOOM`]
/// contribute nothing.
pub fn tile_count(bbox: &BoundingBox, min_zoom: u8, max_zoom: u8) -> u64 {
    if min_zoom > max_zoom {
        return 0;
    }
    (min_zoom..=max_zoom)
        .filter_map(|z| tile_rect(bbox, z))
        .map(|(min_x, max_x, min_y, max_y)| {
            u64::from(max_x - min_x + 1) * u64::from(max_y - min_y + 1)
        })
        .sum()
}

/// Iterates over every tile of a region in download order.
///
/// Order is ascending zoom, then x, then y. The order is stable for a given
/// box and zoom range, which is what makes interrupted downloads resumable.
pub fn tiles_for_region(bbox: &BoundingBox, min_zoom: u8, max_zoom: u8) -> RegionTiles {
    RegionTiles::new(*bbox, min_zoom, max_zoom)
}

/// Iterator returned by [`tiles_for_region`].
#[derive(Debug, Clone)]
pub struct RegionTiles {
    bbox: BoundingBox,
    max_zoom: u8,
    zoom: u8,
    rect: Option<(u32, u32, u32, u32)>,
    x: u32,
    y: u32,
    remaining: u64,
    done: bool,
}

impl RegionTiles {
    fn new(bbox: BoundingBox, min_zoom: u8, max_zoom: u8) -> Self {
        let mut iter = Self {
            bbox,
            max_zoom,
            zoom: min_zoom,
            rect: None,
            x: 0,
            y: 0,
            remaining: tile_count(&bbox, min_zoom, max_zoom),
            done: min_zoom > max_zoom,
        };
        if !iter.done {
            iter.enter_zoom(min_zoom);
        }
        iter
    }

    fn enter_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
        self.rect = tile_rect(&self.bbox, zoom);
        if let Some((min_x, _, min_y, _)) = self.rect {
            self.x = min_x;
            self.y = min_y;
        }
    }

    fn next_zoom(&mut self) {
        if self.zoom >= self.max_zoom {
            self.done = true;
        } else {
            self.enter_zoom(self.zoom + 1);
        }
    }
}

impl Iterator for RegionTiles {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some((_, max_x, min_y, max_y)) = self.rect else {
                self.next_zoom();
                continue;
            };

            if self.x > max_x {
                self.next_zoom();
                continue;
            }

            let tile = TileCoord {
                x: self.x,
                y: self.y,
                z: self.zoom,
            };

            if self.y >= max_y {
                self.y = min_y;
                self.x += 1;
            } else {
                self.y += 1;
            }

            self.remaining = self.remaining.saturating_sub(1);
            return Some(tile);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}
