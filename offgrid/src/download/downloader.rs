//! The region downloader: session admission and control.

use super::session::{Session, SessionContext, SessionControl};
use super::state::{DownloadEvent, DownloadState, DownloadStatus};
use super::DownloadError;
use crate::config::DownloadConfig;
use crate::region::{RegionId, RegionRegistry};
use crate::source::TileSource;
use crate::store::TileStore;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Control surface of the current (or most recent) session.
struct ActiveSession {
    region_id: RegionId,
    paused: watch::Sender<bool>,
    cancellation_token: CancellationToken,
    status: watch::Receiver<DownloadStatus>,
}

impl ActiveSession {
    fn state(&self) -> DownloadState {
        self.status.borrow().state
    }
}

/// Downloads one region at a time.
///
/// Each accepted [`start`](Self::start) spawns a coordinator task that owns
/// the session. The downloader keeps only the channels needed to steer and
/// observe it, so every method here returns immediately except
/// [`cancel`](Self::cancel) and [`wait`](Self::wait), which await the
/// coordinator.
pub struct Downloader<S: TileSource + 'static> {
    source: Arc<S>,
    store: Arc<TileStore>,
    registry: Arc<RegionRegistry>,
    config: DownloadConfig,
    events: broadcast::Sender<DownloadEvent>,
    last_error: Arc<Mutex<Option<String>>>,
    session: Mutex<Option<ActiveSession>>,
    /// Regions that may not start a session, e.g. while being deleted.
    blocked: Mutex<HashSet<RegionId>>,
}

/// Keeps a region from starting a download until dropped.
///
/// Returned by [`Downloader::block_region`].
#[must_use = "the region is unblocked when the guard is dropped"]
pub struct RegionBlock<'a> {
    blocked: &'a Mutex<HashSet<RegionId>>,
    region_id: RegionId,
}

impl Drop for RegionBlock<'_> {
    fn drop(&mut self) {
        self.blocked.lock().remove(&self.region_id);
    }
}

impl<S: TileSource + 'static> Downloader<S> {
    pub fn new(
        source: Arc<S>,
        store: Arc<TileStore>,
        registry: Arc<RegionRegistry>,
        config: DownloadConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            store,
            registry,
            config,
            events,
            last_error: Arc::new(Mutex::new(None)),
            session: Mutex::new(None),
            blocked: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Starts downloading a registered region.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::ConcurrentDownloadRejected`] if a session is
    ///   downloading or paused; that session is left untouched.
    /// - [`DownloadError::RegionBlocked`] while a [`RegionBlock`] is held for
    ///   the region.
    /// - [`DownloadError::RegionNotFound`] if the region is not registered.
    pub fn start(&self, region_id: &RegionId) -> Result<(), DownloadError> {
        let mut slot = self.session.lock();

        if let Some(active) = slot.as_ref() {
            if active.state().is_active() {
                return Err(DownloadError::ConcurrentDownloadRejected {
                    active: active.region_id.clone(),
                });
            }
        }

        if self.blocked.lock().contains(region_id) {
            return Err(DownloadError::RegionBlocked(region_id.clone()));
        }

        let region = self
            .registry
            .get(region_id)
            .ok_or_else(|| DownloadError::RegionNotFound(region_id.clone()))?;

        let (paused_tx, paused_rx) = watch::channel(false);
        let (status_tx, status_rx) =
            watch::channel(DownloadStatus::new(region.id.clone(), region.total_tiles));
        let cancellation_token = CancellationToken::new();

        *self.last_error.lock() = None;

        let session = Session::new(
            SessionContext {
                source: Arc::clone(&self.source),
                store: Arc::clone(&self.store),
                registry: Arc::clone(&self.registry),
                config: self.config,
                events: self.events.clone(),
                last_error: Arc::clone(&self.last_error),
            },
            SessionControl {
                paused: paused_rx,
                cancellation_token: cancellation_token.clone(),
                status: status_tx,
            },
            &region,
        );
        tokio::spawn(session.run());

        info!(region = %region.id, name = %region.name, "Download accepted");
        *slot = Some(ActiveSession {
            region_id: region.id,
            paused: paused_tx,
            cancellation_token,
            status: status_rx,
        });
        Ok(())
    }

    /// Stops dispatching new fetches; in-flight fetches drain.
    pub fn pause(&self) -> Result<(), DownloadError> {
        self.with_active(|active| {
            active.paused.send_replace(true);
        })
    }

    /// Resumes a paused session after re-scanning the store.
    pub fn resume(&self) -> Result<(), DownloadError> {
        self.with_active(|active| {
            active.paused.send_replace(false);
        })
    }

    /// Cancels the active session and waits for its in-flight fetches.
    ///
    /// Tiles already written stay on disk. Returns the final status.
    pub async fn cancel(&self) -> Result<DownloadStatus, DownloadError> {
        let mut status = self.active_status_receiver(|active| active.cancellation_token.cancel())?;
        Ok(wait_terminal(&mut status).await)
    }

    /// Rejects [`start`](Self::start) for `region_id` until the guard drops.
    ///
    /// `start` checks blocks while holding the session lock, so once this
    /// returns any session it admitted for the region is visible to
    /// [`cancel_region`](Self::cancel_region).
    pub fn block_region(&self, region_id: &RegionId) -> RegionBlock<'_> {
        self.blocked.lock().insert(region_id.clone());
        RegionBlock {
            blocked: &self.blocked,
            region_id: region_id.clone(),
        }
    }

    /// Cancels the session only if it is downloading `region_id`.
    ///
    /// Returns true if a session was cancelled.
    pub async fn cancel_region(&self, region_id: &RegionId) -> bool {
        let receiver = {
            let slot = self.session.lock();
            match slot.as_ref() {
                Some(active) if &active.region_id == region_id && active.state().is_active() => {
                    active.cancellation_token.cancel();
                    Some(active.status.clone())
                }
                _ => None,
            }
        };

        match receiver {
            Some(mut status) => {
                wait_terminal(&mut status).await;
                true
            }
            None => false,
        }
    }

    /// Waits for the current session to reach a terminal state.
    pub async fn wait(&self) -> Option<DownloadStatus> {
        let mut status = self.session.lock().as_ref().map(|s| s.status.clone())?;
        Some(wait_terminal(&mut status).await)
    }

    /// Snapshot of the current or most recent session.
    pub fn status(&self) -> Option<DownloadStatus> {
        self.session.lock().as_ref().map(|s| s.status.borrow().clone())
    }

    /// True while a session is downloading or paused.
    pub fn is_active(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.state().is_active())
    }

    /// The most recent error recorded by a session.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Subscribes to download events.
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.events.subscribe()
    }

    fn with_active<F>(&self, f: F) -> Result<(), DownloadError>
    where
        F: FnOnce(&ActiveSession),
    {
        self.active_status_receiver(f).map(|_| ())
    }

    fn active_status_receiver<F>(&self, f: F) -> Result<watch::Receiver<DownloadStatus>, DownloadError>
    where
        F: FnOnce(&ActiveSession),
    {
        let slot = self.session.lock();
        match slot.as_ref() {
            Some(active) if active.state().is_active() => {
                f(active);
                Ok(active.status.clone())
            }
            _ => Err(DownloadError::NoActiveSession),
        }
    }
}

/// Waits until the status watch reports a terminal state.
async fn wait_terminal(status: &mut watch::Receiver<DownloadStatus>) -> DownloadStatus {
    loop {
        {
            let current = status.borrow_and_update();
            if current.state.is_terminal() {
                return current.clone();
            }
        }
        if status.changed().await.is_err() {
            // Coordinator gone
            return status.borrow().clone();
        }
    }
}
