//! Live tile sources.
//!
//! A [`TileSource`] fetches the bytes of one tile from somewhere outside the
//! offline cache. The downloader uses it to fill a region; the resolver uses
//! it as the online fallback.

mod http;
mod xyz;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_USER_AGENT};
pub use xyz::{HttpTileSource, UrlTemplate};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;

use crate::coord::TileCoord;
use std::future::Future;
use thiserror::Error;

/// Errors from fetching a single tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not finish within its deadline
    #[error("Tile fetch timed out")]
    Timeout,

    /// The server answered with something other than 200 OK
    #[error("Tile server returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Tile server returned an empty body")]
    EmptyBody,

    /// Connection, TLS or body read failure
    #[error("Tile fetch failed: {0}")]
    Transport(String),
}

/// Async source of tile bytes.
pub trait TileSource: Send + Sync {
    /// Fetches one tile.
    fn fetch(
        &self,
        tile: TileCoord,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// The source used in production: an XYZ server reached with reqwest.
pub type DefaultTileSource = HttpTileSource<AsyncReqwestClient>;
