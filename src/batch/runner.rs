//! Sequential batch runner
//!
//! Drives a fixed list of [`WorkItem`]s through an [`ItemExecutor`] strictly one
//! at a time, in the given order, with a fixed cool-down between items. Failures
//! are recorded per item and never abort the run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use super::progress::{ProgressReporter, RunProgress};
use super::retry::{ItemError, RetryPolicy};
use super::work_item::{ItemResult, Metrics, WorkItem};

/// Reason recorded for the item that was in flight when a run was cancelled
pub const CANCELLED_REASON: &str = "cancelled";

/// Performs the remote operation for one item
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    async fn execute(&self, item: &WorkItem) -> Result<Metrics, ItemError>;
}

/// Why `start` refused to run
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    #[error("no items to process")]
    Empty,
    #[error("a run is already in progress")]
    AlreadyRunning,
}

/// Runner tuning
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Cool-down between two consecutive items (not after the last one)
    pub delay: Duration,
    /// Deadline for a single executor call; `None` waits forever
    pub item_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            item_timeout: Some(Duration::from_secs(300)),
            retry: RetryPolicy::default(),
        }
    }
}

/// Final tally of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items never attempted because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Final progress snapshot
    pub progress: RunProgress,
}

enum Step {
    Done(ItemResult),
    Cancelled,
}

/// Clears the running flag even if the run future is dropped mid-way
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// At most one run in flight per runner instance
pub struct SequentialRunner {
    config: RunnerConfig,
    reporter: ProgressReporter,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl SequentialRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            reporter: ProgressReporter::new(),
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Receiver that sees every progress write
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.reporter.subscribe()
    }

    pub fn progress(&self) -> RunProgress {
        self.reporter.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop scheduling further items and abort the in-flight call.
    ///
    /// Returns `false` when no run is in progress.
    pub fn cancel(&self) -> bool {
        // same lock as `start`, so the token seen here belongs to the current run
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_running() {
            return false;
        }
        token.cancel();
        true
    }

    /// Process `items` in order. Every call re-processes every item.
    pub async fn start<E>(
        &self,
        items: Vec<WorkItem>,
        executor: &E,
    ) -> Result<RunSummary, StartRejected>
    where
        E: ItemExecutor + ?Sized,
    {
        if items.is_empty() {
            return Err(StartRejected::Empty);
        }
        let token = {
            let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            if self
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tracing::debug!("start ignored: run already in progress");
                return Err(StartRejected::AlreadyRunning);
            }
            *slot = CancellationToken::new();
            slot.clone()
        };
        let _guard = RunningGuard(&self.running);

        let total = items.len();
        tracing::info!(total, delay_ms = self.config.delay.as_millis() as u64, "batch run started");
        self.reporter.begin(&items);

        let mut cancelled = false;
        for (index, item) in items.iter().enumerate() {
            if token.is_cancelled() {
                cancelled = true;
                break;
            }

            self.reporter.mark_running(index);
            tracing::info!(index, id = %item.id, label = %item.label, "processing item");

            match self.run_item(item, executor, &token).await {
                Step::Done(result) => {
                    match &result {
                        ItemResult::Success { metrics } => {
                            tracing::info!(id = %item.id, ?metrics, "item succeeded")
                        }
                        ItemResult::Failure { reason } => {
                            tracing::warn!(id = %item.id, %reason, "item failed")
                        }
                    }
                    self.reporter.record(index, result);
                }
                Step::Cancelled => {
                    self.reporter
                        .record(index, ItemResult::failure(CANCELLED_REASON));
                    cancelled = true;
                    break;
                }
            }

            if index + 1 < total {
                tokio::select! {
                    _ = token.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = sleep(self.config.delay) => {}
                }
            }
        }

        self.reporter.finish(cancelled);
        let progress = self.reporter.snapshot();
        let summary = RunSummary {
            total,
            succeeded: progress.succeeded_count(),
            failed: progress.failed_count(),
            skipped: progress.pending_count(),
            cancelled,
            started_at: progress.started_at.unwrap_or_else(Utc::now),
            finished_at: progress.finished_at.unwrap_or_else(Utc::now),
            progress,
        };
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled,
            "batch run finished"
        );
        Ok(summary)
    }

    /// One item, including bounded retries of transient failures
    async fn run_item<E>(&self, item: &WorkItem, executor: &E, token: &CancellationToken) -> Step
    where
        E: ItemExecutor + ?Sized,
    {
        let mut attempt: u32 = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Step::Cancelled,
                outcome = self.call_with_deadline(item, executor) => outcome,
            };

            let error = match outcome {
                Ok(metrics) => return Step::Done(ItemResult::success(metrics)),
                Err(error) => error,
            };

            if !self.config.retry.should_retry(&error, attempt) {
                return Step::Done(ItemResult::failure(error.reason));
            }

            let delay = self.config.retry.backoff_delay(attempt);
            tracing::warn!(
                id = %item.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %error.reason,
                "transient failure, retrying"
            );
            tokio::select! {
                _ = token.cancelled() => return Step::Cancelled,
                _ = sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn call_with_deadline<E>(&self, item: &WorkItem, executor: &E) -> Result<Metrics, ItemError>
    where
        E: ItemExecutor + ?Sized,
    {
        match self.config.item_timeout {
            Some(limit) => match timeout(limit, executor.execute(item)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ItemError::transient(format!(
                    "timed out after {} ms",
                    limit.as_millis()
                ))),
            },
            None => executor.execute(item).await,
        }
    }
}

impl Default for SequentialRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}
