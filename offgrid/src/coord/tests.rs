//! Tests for tile math

use super::*;

fn paris() -> GeoPoint {
    GeoPoint::new(48.8566, 2.3522)
}

#[test]
fn test_new_york_city_at_zoom_16() {
    // New York City: 40.7128°N, 74.0060°W
    let (x, y) = tile_for_point(40.7128, -74.0060, 16);
    assert_eq!(x, 19295, "NYC longitude should map to x 19295 at zoom 16");
    assert_eq!(y, 24640, "NYC latitude should map to y 24640 at zoom 16");
}

#[test]
fn test_london_at_zoom_10() {
    let (x, y) = tile_for_point(51.5074, -0.1278, 10);
    assert_eq!(x, 511);
    assert_eq!(y, 340);
}

#[test]
fn test_equator_prime_meridian() {
    // At zoom 1: 2×2 tiles, 0°N 0°E is the top-left of the south-east tile
    assert_eq!(tile_for_point(0.0, 0.0, 1), (1, 1));
}

#[test]
fn test_zoom_zero_is_single_tile() {
    assert_eq!(tile_for_point(45.0, 90.0, 0), (0, 0));
    assert_eq!(tile_for_point(-45.0, -90.0, 0), (0, 0));
}

#[test]
fn test_tile_at_matches_tile_for_point() {
    let tile = tile_at(paris(), 12);
    assert_eq!(tile, TileCoord { x: 2074, y: 1409, z: 12 });
}

#[test]
fn test_zoom_increase_roughly_doubles() {
    let point = paris();
    for zoom in 0..20 {
        let (x0, y0) = tile_for_point(point.lat, point.lon, zoom);
        let (x1, y1) = tile_for_point(point.lat, point.lon, zoom + 1);
        assert!(
            x1 == 2 * x0 || x1 == 2 * x0 + 1,
            "zoom {}: x {} -> {}",
            zoom,
            x0,
            x1
        );
        assert!(
            y1 == 2 * y0 || y1 == 2 * y0 + 1,
            "zoom {}: y {} -> {}",
            zoom,
            y0,
            y1
        );
    }
}

#[test]
fn test_tile_bounds_contain_source_point() {
    let points = [
        paris(),
        GeoPoint::new(40.7128, -74.0060),
        GeoPoint::new(-33.8688, 151.2093),
        GeoPoint::new(64.1466, -21.9426),
        GeoPoint::new(-54.8019, -68.3030),
    ];
    // Tolerance for floating point at tile edges
    let eps = 1e-9;

    for point in points {
        for zoom in [0, 3, 8, 12, 16, 20] {
            let tile = tile_at(point, zoom);
            let bounds = tile_bounds(&tile);
            assert!(
                point.lat <= bounds.north + eps && point.lat >= bounds.south - eps,
                "zoom {}: lat {} not in [{}, {}]",
                zoom,
                point.lat,
                bounds.south,
                bounds.north
            );
            assert!(
                point.lon >= bounds.west - eps && point.lon <= bounds.east + eps,
                "zoom {}: lon {} not in [{}, {}]",
                zoom,
                point.lon,
                bounds.west,
                bounds.east
            );
        }
    }
}

#[test]
fn test_tile_to_lat_lon_northwest_corner() {
    let tile = TileCoord {
        x: 19295,
        y: 24640,
        z: 16,
    };
    let (lat, lon) = tile_to_lat_lon(&tile);
    assert!((lat - 40.713).abs() < 0.01);
    assert!((lon - (-74.007)).abs() < 0.01);
}

#[test]
fn test_tile_coord_new_validates_grid() {
    assert!(TileCoord::new(0, 0, 0).is_ok());
    assert!(TileCoord::new(1023, 1023, 10).is_ok());
    assert_eq!(
        TileCoord::new(1024, 0, 10),
        Err(CoordError::OutOfGrid {
            x: 1024,
            y: 0,
            z: 10
        })
    );
    assert_eq!(TileCoord::new(0, 0, 23), Err(CoordError::InvalidZoom(23)));
}

#[test]
fn test_tile_coord_display() {
    let tile = TileCoord { x: 3, y: 5, z: 7 };
    assert_eq!(tile.to_string(), "7/3/5");
}

// =============================================================================
// Bounding boxes
// =============================================================================

/// 0.01° × 0.01° box straddling the equator and prime meridian.
fn straddling_box() -> BoundingBox {
    BoundingBox::new(0.005, -0.005, 0.005, -0.005)
}

#[test]
fn test_small_box_at_zoom_14_needs_four_tiles() {
    let tiles = tiles_for_bbox(&straddling_box(), 14);
    assert_eq!(
        tiles,
        vec![
            TileCoord {
                x: 8191,
                y: 8191,
                z: 14
            },
            TileCoord {
                x: 8191,
                y: 8192,
                z: 14
            },
            TileCoord {
                x: 8192,
                y: 8191,
                z: 14
            },
            TileCoord {
                x: 8192,
                y: 8192,
                z: 14
            },
        ]
    );
    assert_eq!(tile_count(&straddling_box(), 14, 14), 4);
}

#[test]
fn test_inverted_box_yields_no_tiles() {
    let inverted = BoundingBox::new(-1.0, 1.0, 1.0, -1.0);
    assert!(tiles_for_bbox(&inverted, 10).is_empty());
    assert_eq!(tile_count(&inverted, 0, 10), 0);

    let antimeridian = BoundingBox::new(10.0, 0.0, -170.0, 170.0);
    assert!(tiles_for_bbox(&antimeridian, 5).is_empty());
}

#[test]
fn test_inverted_box_at_low_zoom_yields_no_tiles() {
    // Both corners share tile 0/0/0, but the box is still inverted.
    let inverted = BoundingBox::new(-1.0, 1.0, 1.0, -1.0);
    assert_eq!(tile_for_point(-1.0, -1.0, 0), tile_for_point(1.0, 1.0, 0));
    assert!(tiles_for_bbox(&inverted, 0).is_empty());
    assert_eq!(tiles_for_region(&inverted, 0, 3).count(), 0);
}

#[test]
fn test_non_finite_box_yields_no_tiles() {
    let boxes = [
        BoundingBox::new(f64::NAN, 0.0, 1.0, 0.0),
        BoundingBox::new(1.0, 0.0, f64::INFINITY, 0.0),
    ];
    for bbox in boxes {
        assert!(tiles_for_bbox(&bbox, 4).is_empty());
        assert_eq!(tile_count(&bbox, 0, 10), 0);
    }
}

#[test]
fn test_zoom_above_max_contributes_nothing() {
    let bbox = BoundingBox::from_center_span(paris(), 0.001, 0.001);

    assert_eq!(tile_count(&bbox, 60, 70), 0);
    assert_eq!(tile_count(&bbox, 23, u8::MAX), 0);
    assert!(tiles_for_bbox(&bbox, 64).is_empty());
    assert_eq!(
        tiles_for_region(&bbox, 21, u8::MAX).count() as u64,
        tile_count(&bbox, 21, MAX_ZOOM)
    );

    // Out-of-domain zooms still return without panicking.
    let _ = tile_for_point(paris().lat, paris().lon, u8::MAX);
}

#[test]
fn test_out_of_domain_box_is_clamped_to_grid() {
    let bbox = BoundingBox::new(89.0, -89.0, 500.0, -500.0);
    assert_eq!(tile_count(&bbox, 2, 2), 16);
}

#[test]
fn test_tile_count_min_greater_than_max_is_zero() {
    let bbox = BoundingBox::from_center_span(paris(), 0.5, 0.5);
    assert_eq!(tile_count(&bbox, 12, 10), 0);
    assert_eq!(tiles_for_region(&bbox, 12, 10).count(), 0);
}

#[test]
fn test_tile_count_equals_sum_of_enumerations() {
    let boxes = [
        straddling_box(),
        BoundingBox::from_center_span(paris(), 0.3, 0.6),
        BoundingBox::new(60.0, 50.0, 10.0, -5.0),
        BoundingBox::new(-33.0, -34.5, 151.5, 150.5),
        BoundingBox::new(1.0, 1.0, 1.0, 1.0),
    ];
    let ranges = [(0, 0), (0, 6), (5, 11), (10, 13), (14, 14)];

    for bbox in &boxes {
        for (min_zoom, max_zoom) in ranges {
            let summed: u64 = (min_zoom..=max_zoom)
                .map(|z| tiles_for_bbox(bbox, z).len() as u64)
                .sum();
            assert_eq!(
                tile_count(bbox, min_zoom, max_zoom),
                summed,
                "bbox {:?} zooms {}..={}",
                bbox,
                min_zoom,
                max_zoom
            );
        }
    }
}

#[test]
fn test_region_tiles_order_is_zoom_then_x_then_y() {
    let bbox = BoundingBox::from_center_span(paris(), 0.2, 0.2);
    let tiles: Vec<_> = tiles_for_region(&bbox, 9, 12).collect();

    assert_eq!(tiles.len() as u64, tile_count(&bbox, 9, 12));

    let mut sorted = tiles.clone();
    sorted.sort();
    assert_eq!(tiles, sorted, "download order must be (z, x, y) ascending");

    let mut expected = Vec::new();
    for z in 9..=12 {
        expected.extend(tiles_for_bbox(&bbox, z));
    }
    assert_eq!(tiles, expected);
}

#[test]
fn test_region_tiles_size_hint_tracks_remaining() {
    let mut iter = tiles_for_region(&straddling_box(), 13, 14);
    let total = tile_count(&straddling_box(), 13, 14) as usize;
    assert_eq!(iter.size_hint(), (total, Some(total)));
    iter.next();
    assert_eq!(iter.size_hint(), (total - 1, Some(total - 1)));
}

#[test]
fn test_bbox_from_center_span() {
    let bbox = BoundingBox::from_center_span(GeoPoint::new(10.0, 20.0), 2.0, 4.0);
    assert_eq!(bbox, BoundingBox::new(11.0, 9.0, 22.0, 18.0));
    assert_eq!(bbox.center(), GeoPoint::new(10.0, 20.0));
}

#[test]
fn test_bbox_contains_is_inclusive() {
    let bbox = BoundingBox::new(1.0, -1.0, 1.0, -1.0);
    assert!(bbox.contains(GeoPoint::new(0.0, 0.0)));
    assert!(bbox.contains(GeoPoint::new(1.0, 1.0)));
    assert!(bbox.contains(GeoPoint::new(-1.0, -1.0)));
    assert!(!bbox.contains(GeoPoint::new(1.0001, 0.0)));
    assert!(!bbox.contains(GeoPoint::new(0.0, -1.0001)));
}

#[test]
fn test_bbox_validate() {
    assert!(straddling_box().validate().is_ok());
    assert_eq!(
        BoundingBox::new(-1.0, 1.0, 1.0, -1.0).validate(),
        Err(CoordError::InvertedBoundingBox)
    );
    assert!(matches!(
        BoundingBox::new(89.0, 80.0, 1.0, 0.0).validate(),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(matches!(
        BoundingBox::new(1.0, 0.0, 180.0, 170.0).validate(),
        Err(CoordError::InvalidLongitude(_))
    ));
    assert_eq!(
        BoundingBox::new(f64::NAN, 0.0, 1.0, 0.0).validate(),
        Err(CoordError::InvertedBoundingBox)
    );
}

#[test]
fn test_geo_point_validate() {
    assert!(GeoPoint::new(51.5, -0.12).validate().is_ok());
    assert!(GeoPoint::new(MAX_LAT, MIN_LON).validate().is_ok());
    assert!(matches!(
        GeoPoint::new(86.0, 0.0).validate(),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(matches!(
        GeoPoint::new(0.0, 180.0).validate(),
        Err(CoordError::InvalidLongitude(_))
    ));
    assert!(GeoPoint::new(f64::NAN, 0.0).validate().is_err());
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The tile containing a point has bounds that contain the point.
        #[test]
        fn tile_bounds_contain_point(
            lat in -85.0f64..85.0,
            lon in -180.0f64..179.999,
            zoom in 0u8..=18,
        ) {
            let point = GeoPoint::new(lat, lon);
            let tile = tile_at(point, zoom);
            prop_assert!(tile.is_valid());

            let bounds = tile_bounds(&tile);
            let eps = 1e-9;
            prop_assert!(point.lat <= bounds.north + eps && point.lat >= bounds.south - eps);
            prop_assert!(point.lon >= bounds.west - eps && point.lon <= bounds.east + eps);
        }

        /// Counting agrees with enumeration for any small box.
        #[test]
        fn tile_count_matches_enumeration(
            south in -60.0f64..60.0,
            west in -170.0f64..170.0,
            height in 0.0f64..0.5,
            width in 0.0f64..0.5,
            min_zoom in 0u8..=8,
            extra in 0u8..=3,
        ) {
            let bbox = BoundingBox::new(south + height, south, west + width, west);
            let max_zoom = min_zoom + extra;
            let enumerated = tiles_for_region(&bbox, min_zoom, max_zoom).count() as u64;
            prop_assert_eq!(tile_count(&bbox, min_zoom, max_zoom), enumerated);
        }
    }
}
