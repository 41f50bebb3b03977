//! "No data" placeholder tile.
//!
//! Served when a tile is neither cached nor fetchable, so the map surface
//! always has something to draw.

use image::{ImageError, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Edge length of a placeholder tile in pixels.
pub const PLACEHOLDER_SIZE: u32 = 256;

/// Spacing of the placeholder grid lines in pixels.
const GRID_SPACING: u32 = 32;

const BACKGROUND: Rgba<u8> = Rgba([200, 200, 200, 255]);
const GRID_LINE: Rgba<u8> = Rgba([170, 170, 170, 255]);

/// Generate a gray placeholder tile with a light grid, encoded as PNG.
///
/// # Examples
///
/// ```
/// use offgrid::resolver::generate_placeholder;
///
/// let png = generate_placeholder(256).unwrap();
/// assert_eq!(&png[1..4], b"PNG");
/// ```
pub fn generate_placeholder(size: u32) -> Result<Vec<u8>, ImageError> {
    let image = RgbaImage::from_fn(size, size, |x, y| {
        if x % GRID_SPACING == 0 || y % GRID_SPACING == 0 {
            GRID_LINE
        } else {
            BACKGROUND
        }
    });

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Generate the standard 256×256 placeholder.
pub fn generate_default_placeholder() -> Result<Vec<u8>, ImageError> {
    generate_placeholder(PLACEHOLDER_SIZE)
}
