//! Tests for the downloader session state machine

use super::*;
use crate::config::DownloadConfig;
use crate::coord::{BoundingBox, TileCoord};
use crate::region::{NewRegion, Region, RegionRegistry};
use crate::source::{FetchError, TileSource};
use crate::store::TileStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, Semaphore};

// =============================================================================
// Test source
// =============================================================================

/// Source whose fetches wait on a semaphore, one permit per fetch.
struct GatedSource {
    gate: Semaphore,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    failing: HashSet<TileCoord>,
    failures_enabled: AtomicBool,
}

impl GatedSource {
    fn closed() -> Arc<Self> {
        Self::with_failing(HashSet::new(), 0)
    }

    fn open() -> Arc<Self> {
        Self::with_failing(HashSet::new(), 10_000)
    }

    fn with_failing(failing: HashSet<TileCoord>, permits: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(permits),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            failing,
            failures_enabled: AtomicBool::new(true),
        })
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TileSource for GatedSource {
    async fn fetch(&self, tile: TileCoord) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failures_enabled.load(Ordering::SeqCst) && self.failing.contains(&tile) {
            return Err(FetchError::HttpStatus(500));
        }
        Ok(format!("{}", tile).into_bytes())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

// =============================================================================
// Fixture
// =============================================================================

struct Fixture {
    _temp: TempDir,
    store: Arc<TileStore>,
    registry: Arc<RegionRegistry>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(TileStore::new(temp.path()).unwrap());
        let registry = Arc::new(
            RegionRegistry::load(temp.path().join("regions.json"), Arc::clone(&store)).unwrap(),
        );
        Self {
            _temp: temp,
            store,
            registry,
        }
    }

    /// Four tiles at zoom 14 around (0, 0).
    fn add_square(&self) -> Region {
        self.registry
            .add(NewRegion::new(
                "square",
                BoundingBox::new(0.005, -0.005, 0.005, -0.005),
                14,
                14,
            ))
            .unwrap()
    }

    fn downloader(&self, source: Arc<GatedSource>, parallel: usize) -> Downloader<GatedSource> {
        let config = DownloadConfig::new()
            .with_parallel_downloads(parallel)
            .with_max_retries(1)
            .with_retry_base_delay_ms(1)
            .with_timeout(Duration::from_millis(200));
        Downloader::new(
            source,
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            config,
        )
    }
}

fn square_tiles() -> Vec<TileCoord> {
    [(8191, 8191), (8191, 8192), (8192, 8191), (8192, 8192)]
        .into_iter()
        .map(|(x, y)| TileCoord { x, y, z: 14 })
        .collect()
}

async fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

fn drain_events(rx: &mut broadcast::Receiver<DownloadEvent>) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn test_start_unknown_region() {
    let fx = Fixture::new();
    let downloader = fx.downloader(GatedSource::open(), 2);

    let result = downloader.start(&RegionId::from("missing"));
    assert!(matches!(result, Err(DownloadError::RegionNotFound(_))));
    assert!(downloader.status().is_none());
}

#[tokio::test]
async fn test_controls_without_session() {
    let fx = Fixture::new();
    let downloader = fx.downloader(GatedSource::open(), 2);

    assert!(matches!(downloader.pause(), Err(DownloadError::NoActiveSession)));
    assert!(matches!(downloader.resume(), Err(DownloadError::NoActiveSession)));
    assert!(matches!(
        downloader.cancel().await,
        Err(DownloadError::NoActiveSession)
    ));
    assert!(downloader.wait().await.is_none());
}

#[tokio::test]
async fn test_second_start_is_rejected_and_first_session_unchanged() {
    let fx = Fixture::new();
    let first = fx.add_square();
    let second = fx.add_square();
    let source = GatedSource::closed();
    let downloader = fx.downloader(Arc::clone(&source), 2);

    downloader.start(&first.id).unwrap();
    wait_for("first fetches", || source.calls() == 2).await;

    match downloader.start(&second.id) {
        Err(DownloadError::ConcurrentDownloadRejected { active }) => assert_eq!(active, first.id),
        other => panic!("expected rejection, got {:?}", other),
    }
    let status = downloader.status().unwrap();
    assert_eq!(status.region_id, first.id);
    assert_eq!(status.state, DownloadState::Downloading);

    source.release(100);
    let done = downloader.wait().await.unwrap();
    assert_eq!(done.region_id, first.id);
    assert_eq!(done.state, DownloadState::Completed);
    assert!(!fx.store.exists(second.id.as_str(), &square_tiles()[0]).await);
}

#[tokio::test]
async fn test_new_session_allowed_after_terminal() {
    let fx = Fixture::new();
    let first = fx.add_square();
    let second = fx.add_square();
    let downloader = fx.downloader(GatedSource::open(), 2);

    downloader.start(&first.id).unwrap();
    downloader.wait().await.unwrap();
    assert!(!downloader.is_active());

    downloader.start(&second.id).unwrap();
    let done = downloader.wait().await.unwrap();
    assert_eq!(done.region_id, second.id);
    assert_eq!(done.state, DownloadState::Completed);
}

// =============================================================================
// Fetch loop
// =============================================================================

#[tokio::test]
async fn test_completes_and_records_region() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let downloader = fx.downloader(GatedSource::open(), 4);
    let mut events = downloader.subscribe();

    downloader.start(&region.id).unwrap();
    let status = downloader.wait().await.unwrap();

    assert_eq!(status.state, DownloadState::Completed);
    assert_eq!(status.downloaded, 4);
    assert_eq!(status.progress(), 1.0);

    let stored = fx.registry.get(&region.id).unwrap();
    assert!(stored.is_complete());
    assert_eq!(stored.actual_size_bytes, fx.store.size(region.id.as_str()).await.unwrap());
    assert!(stored.actual_size_bytes > 0);

    let events = drain_events(&mut events);
    assert!(matches!(
        events.first(),
        Some(DownloadEvent::Started { total: 4, already_downloaded: 0, .. })
    ));
    let progress: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            DownloadEvent::Progress { downloaded, .. } => Some(*downloaded),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![0, 1, 2, 3, 4]);
    assert!(matches!(events.last(), Some(DownloadEvent::Completed { .. })));
}

#[tokio::test]
async fn test_in_flight_never_exceeds_parallelism() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let source = GatedSource::closed();
    let downloader = fx.downloader(Arc::clone(&source), 2);

    downloader.start(&region.id).unwrap();
    wait_for("two fetches", || source.calls() == 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(downloader.status().unwrap().in_flight, 2);

    source.release(100);
    downloader.wait().await.unwrap();
    assert_eq!(source.max_active.load(Ordering::SeqCst), 2);
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_existing_tiles_are_skipped() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let tiles = square_tiles();
    fx.store.write(region.id.as_str(), &tiles[0], b"a").await.unwrap();
    fx.store.write(region.id.as_str(), &tiles[3], b"b").await.unwrap();
    let source = GatedSource::open();
    let downloader = fx.downloader(Arc::clone(&source), 4);

    downloader.start(&region.id).unwrap();
    let status = downloader.wait().await.unwrap();

    assert_eq!(status.state, DownloadState::Completed);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_failed_tile_does_not_abort_session() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let bad = square_tiles()[1];
    let source = GatedSource::with_failing([bad].into_iter().collect(), 10_000);
    let downloader = fx.downloader(Arc::clone(&source), 1);
    let mut events = downloader.subscribe();

    downloader.start(&region.id).unwrap();
    let status = downloader.wait().await.unwrap();

    assert_eq!(status.state, DownloadState::Failed);
    assert_eq!(status.downloaded, 3);
    assert_eq!(status.failed, 1);
    // One attempt plus one retry for the bad tile.
    assert_eq!(source.calls(), 5);
    assert!(downloader.last_error().is_some());

    let stored = fx.registry.get(&region.id).unwrap();
    assert!(!stored.is_complete());
    assert_eq!(stored.downloaded_tiles, 3);
    assert!(matches!(
        drain_events(&mut events).last(),
        Some(DownloadEvent::Failed { failed_tile_count: 1, .. })
    ));

    // Restarting only fetches the missing tile.
    source.failures_enabled.store(false, Ordering::SeqCst);
    downloader.start(&region.id).unwrap();
    let status = downloader.wait().await.unwrap();
    assert_eq!(status.state, DownloadState::Completed);
    assert_eq!(source.calls(), 6);
    assert!(downloader.last_error().is_none());
}

// =============================================================================
// Pause, resume, cancel
// =============================================================================

#[tokio::test]
async fn test_pause_drains_then_resume_rescans() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let tiles = square_tiles();
    let source = GatedSource::closed();
    let downloader = fx.downloader(Arc::clone(&source), 1);
    let mut events = downloader.subscribe();

    downloader.start(&region.id).unwrap();
    wait_for("first fetch", || source.calls() == 1).await;

    downloader.pause().unwrap();
    source.release(1);
    wait_for("paused", || {
        downloader.status().unwrap().state == DownloadState::Paused
    })
    .await;

    let status = downloader.status().unwrap();
    assert_eq!(status.downloaded, 1);
    assert_eq!(status.in_flight, 0);
    assert!(downloader.is_active());

    // Nothing is dispatched while paused.
    source.release(100);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.calls(), 1);

    // A tile that lands on disk while paused is picked up by the rescan.
    fx.store.write(region.id.as_str(), &tiles[3], b"x").await.unwrap();

    downloader.resume().unwrap();
    let status = downloader.wait().await.unwrap();

    assert_eq!(status.state, DownloadState::Completed);
    assert_eq!(source.calls(), 3);

    let events = drain_events(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, DownloadEvent::Paused { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, DownloadEvent::Resumed { downloaded: 2, .. })));
}

#[tokio::test]
async fn test_cancel_waits_for_drain_and_keeps_tiles() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let source = GatedSource::closed();
    let downloader = fx.downloader(Arc::clone(&source), 1);

    downloader.start(&region.id).unwrap();
    wait_for("first fetch", || source.calls() == 1).await;
    source.release(1);
    wait_for("second fetch", || source.calls() == 2).await;

    let status = downloader.cancel().await.unwrap();

    assert_eq!(status.state, DownloadState::Cancelled);
    assert_eq!(status.in_flight, 0);
    assert!(!downloader.is_active());
    assert!(fx.store.exists(region.id.as_str(), &square_tiles()[0]).await);
    assert_eq!(source.calls(), 2);

    let stored = fx.registry.get(&region.id).unwrap();
    assert_eq!(stored.downloaded_tiles, 1);
    assert!(!stored.is_complete());
}

#[tokio::test]
async fn test_cancel_while_paused() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let source = GatedSource::closed();
    let downloader = fx.downloader(Arc::clone(&source), 1);

    downloader.start(&region.id).unwrap();
    wait_for("first fetch", || source.calls() == 1).await;
    downloader.pause().unwrap();
    source.release(1);
    wait_for("paused", || {
        downloader.status().unwrap().state == DownloadState::Paused
    })
    .await;

    let status = downloader.cancel().await.unwrap();
    assert_eq!(status.state, DownloadState::Cancelled);
    assert!(matches!(downloader.resume(), Err(DownloadError::NoActiveSession)));
}

#[tokio::test]
async fn test_cancel_region_ignores_other_regions() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let downloader = fx.downloader(GatedSource::closed(), 1);

    downloader.start(&region.id).unwrap();

    assert!(!downloader.cancel_region(&RegionId::from("other")).await);
    assert!(downloader.is_active());
    assert!(downloader.cancel_region(&region.id).await);
    assert!(!downloader.is_active());
}

#[tokio::test]
async fn test_progress_writes_are_throttled_but_pause_persists() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let source = GatedSource::closed();
    let downloader = fx.downloader(Arc::clone(&source), 1);

    downloader.start(&region.id).unwrap();
    wait_for("first fetch", || source.calls() == 1).await;
    source.release(1);
    wait_for("second fetch", || source.calls() == 2).await;

    // The first tile lands right after the start-up write.
    assert_eq!(downloader.status().unwrap().downloaded, 1);
    assert_eq!(fx.registry.get(&region.id).unwrap().downloaded_tiles, 0);

    downloader.pause().unwrap();
    source.release(4);
    wait_for("paused", || {
        downloader
            .status()
            .is_some_and(|s| s.state == DownloadState::Paused)
    })
    .await;

    let status = downloader.status().unwrap();
    assert_eq!(
        fx.registry.get(&region.id).unwrap().downloaded_tiles,
        status.downloaded
    );
    downloader.cancel().await.unwrap();
}

#[tokio::test]
async fn test_blocked_region_cannot_start_until_guard_drops() {
    let fx = Fixture::new();
    let region = fx.add_square();
    let other = fx.add_square();
    let downloader = fx.downloader(GatedSource::open(), 2);

    let block = downloader.block_region(&region.id);
    assert!(matches!(
        downloader.start(&region.id),
        Err(DownloadError::RegionBlocked(id)) if id == region.id
    ));
    assert!(downloader.status().is_none());

    // Other regions are unaffected.
    downloader.start(&other.id).unwrap();
    downloader.wait().await.unwrap();

    drop(block);
    downloader.start(&region.id).unwrap();
    let status = downloader.wait().await.unwrap();
    assert_eq!(status.state, DownloadState::Completed);
}
