//! Fixed-interval poller mirroring the backend's scraper fleet
//!
//! One background task fetches a snapshot, waits `interval`, fetches again.
//! A tick always finishes before the next one is scheduled, so requests never
//! overlap. A successful tick replaces the whole snapshot; a failed tick keeps
//! the previous one and is only logged.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::status::FleetStatus;
use crate::api::{AdminApiClient, ApiError};

/// Remote side of the fleet: read status, trigger a full scrape
#[async_trait]
pub trait FleetBackend: Send + Sync {
    async fn fetch_status(&self) -> Result<FleetStatus, ApiError>;

    /// Fire-and-forget; completion is only observable through later snapshots
    async fn start_all(&self) -> Result<(), ApiError>;
}

#[async_trait]
impl FleetBackend for AdminApiClient {
    async fn fetch_status(&self) -> Result<FleetStatus, ApiError> {
        self.scraper_status().await
    }

    async fn start_all(&self) -> Result<(), ApiError> {
        self.scrape_all().await
    }
}

/// Tick counters, for logs and diagnostics only
#[derive(Debug, Default)]
pub struct PollStats {
    ticks: AtomicU64,
    failed_ticks: AtomicU64,
}

impl PollStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks.load(Ordering::Relaxed)
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct StatusPoller {
    backend: Arc<dyn FleetBackend>,
    snapshot: watch::Sender<Option<FleetStatus>>,
    stats: Arc<PollStats>,
    refresh: Arc<Notify>,
    task: Option<PollTask>,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn FleetBackend>) -> Self {
        let (snapshot, _rx) = watch::channel(None);
        Self {
            backend,
            snapshot,
            stats: Arc::new(PollStats::default()),
            refresh: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// Fetch now, then every `interval`, until [`stop_polling`](Self::stop_polling)
    /// or drop. No-op if already polling.
    pub fn start_polling(&mut self, interval: Duration) {
        if self.is_polling() {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            self.backend.clone(),
            self.snapshot.clone(),
            self.stats.clone(),
            self.refresh.clone(),
            cancel.clone(),
            interval,
        ));
        tracing::info!(interval_ms = interval.as_millis() as u64, "fleet polling started");
        self.task = Some(PollTask { cancel, handle });
    }

    pub fn stop_polling(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            tracing::info!("fleet polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.handle.is_finished())
    }

    /// Cut the current wait short; the tick still never overlaps another one
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Ask the backend to start every scraper, without waiting.
    ///
    /// The effect shows up in a later scheduled tick; the handle only
    /// carries whether the backend accepted the request.
    pub fn trigger_scrape_all(&self) -> JoinHandle<Result<(), ApiError>> {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            let result = backend.start_all().await;
            match &result {
                Ok(()) => tracing::info!("scrape-all requested"),
                Err(error) => tracing::warn!(%error, "scrape-all request failed"),
            }
            result
        })
    }

    /// Latest good snapshot, `None` until the first successful tick
    pub fn snapshot(&self) -> Option<FleetStatus> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<FleetStatus>> {
        self.snapshot.subscribe()
    }

    pub fn stats(&self) -> Arc<PollStats> {
        self.stats.clone()
    }

    pub fn backend(&self) -> Arc<dyn FleetBackend> {
        self.backend.clone()
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn poll_loop(
    backend: Arc<dyn FleetBackend>,
    snapshot: watch::Sender<Option<FleetStatus>>,
    stats: Arc<PollStats>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    interval: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = poll_once(backend.as_ref(), &snapshot, &stats) => {}
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = refresh.notified() => {}
            _ = sleep(interval) => {}
        }
    }
}

/// One tick. Returns whether the snapshot was replaced.
pub async fn poll_once(
    backend: &dyn FleetBackend,
    snapshot: &watch::Sender<Option<FleetStatus>>,
    stats: &PollStats,
) -> bool {
    stats.ticks.fetch_add(1, Ordering::Relaxed);
    match backend.fetch_status().await {
        Ok(status) => {
            tracing::debug!(
                units = status.units.len(),
                global = %status.global_status,
                "fleet snapshot received"
            );
            snapshot.send_replace(Some(status));
            true
        }
        Err(error) => {
            let failed = stats.failed_ticks.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(%error, failed_ticks = failed, "fleet status poll failed, keeping last snapshot");
            false
        }
    }
}
