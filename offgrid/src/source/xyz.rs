//! XYZ tile server source.
//!
//! # URL Template
//!
//! `https://tile.example.org/{z}/{x}/{y}.png`
//!
//! - `{z}` - Zoom level
//! - `{x}` - Column (0 to 2^zoom - 1, west to east)
//! - `{y}` - Row (0 to 2^zoom - 1, north to south)
//!
//! A template carrying none of the placeholders is a base URL; the standard
//! `/{z}/{x}/{y}.png` suffix is appended to it.

use super::{AsyncHttpClient, FetchError, TileSource};
use crate::coord::TileCoord;

/// Suffix appended to base URLs without placeholders.
const XYZ_SUFFIX: &str = "/{z}/{x}/{y}.png";

/// A tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let has_placeholder = ["{z}", "{x}", "{y}"].iter().any(|p| template.contains(p));
        if has_placeholder {
            Self(template)
        } else {
            Self(format!("{}{}", template.trim_end_matches('/'), XYZ_SUFFIX))
        }
    }

    /// The normalized template string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitutes a tile's coordinates into the template.
    pub fn render(&self, tile: &TileCoord) -> String {
        self.0
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

/// Live tile source backed by an XYZ HTTP tile server.
pub struct HttpTileSource<C: AsyncHttpClient> {
    http_client: C,
    template: UrlTemplate,
}

impl<C: AsyncHttpClient> HttpTileSource<C> {
    pub fn new(http_client: C, template: UrlTemplate) -> Self {
        Self {
            http_client,
            template,
        }
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }
}

impl<C: AsyncHttpClient> TileSource for HttpTileSource<C> {
    async fn fetch(&self, tile: TileCoord) -> Result<Vec<u8>, FetchError> {
        let url = self.template.render(&tile);
        self.http_client.get(&url).await
    }

    fn name(&self) -> &str {
        "XYZ tile server"
    }
}
