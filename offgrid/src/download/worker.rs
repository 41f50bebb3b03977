//! Single-tile fetch with retry, backoff and cooperative cancellation.

use crate::config::DownloadConfig;
use crate::coord::TileCoord;
use crate::region::RegionId;
use crate::source::{FetchError, TileSource};
use crate::store::TileStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// How a tile's fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TileOutcome {
    /// Fetched and written to the store.
    Stored { tile: TileCoord, bytes: usize },

    /// Every attempt failed.
    Failed {
        tile: TileCoord,
        attempts: u32,
        error: String,
    },

    /// Cancellation was observed before the tile was stored.
    Cancelled { tile: TileCoord },
}

/// Fetches a tile and writes it to the store.
///
/// A failed fetch or a failed write consumes one attempt. The tile gets
/// `1 + max_retries` attempts with exponential backoff in between.
/// Cancellation is checked before each attempt and during backoff; a fetch
/// already running is left to finish or time out.
pub(crate) async fn fetch_tile<S: TileSource>(
    region_id: RegionId,
    tile: TileCoord,
    source: Arc<S>,
    store: Arc<TileStore>,
    config: DownloadConfig,
    cancellation_token: CancellationToken,
) -> TileOutcome {
    let attempts = config.max_retries().saturating_add(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if cancellation_token.is_cancelled() {
            return TileOutcome::Cancelled { tile };
        }

        let result = match tokio::time::timeout(config.timeout(), source.fetch(tile)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match result {
            Ok(data) => match store.write(region_id.as_str(), &tile, &data).await {
                Ok(()) => {
                    trace!(region = %region_id, tile = %tile, bytes = data.len(), "Tile stored");
                    return TileOutcome::Stored {
                        tile,
                        bytes: data.len(),
                    };
                }
                Err(e) => {
                    warn!(region = %region_id, tile = %tile, attempt = attempt + 1, error = %e, "Tile write failed");
                    last_error = e.to_string();
                }
            },
            Err(e) => {
                debug!(region = %region_id, tile = %tile, attempt = attempt + 1, error = %e, "Tile fetch failed");
                last_error = e.to_string();
            }
        }

        if attempt + 1 < attempts {
            let backoff = config.backoff(attempt);
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    return TileOutcome::Cancelled { tile };
                }
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    warn!(
        region = %region_id,
        tile = %tile,
        attempts = attempts,
        error = %last_error,
        "Tile failed after all retries"
    );
    TileOutcome::Failed {
        tile,
        attempts,
        error: last_error,
    }
}
