//! Sequential batch processing with live progress
//!
//! - [`runner::SequentialRunner`] - processes items one at a time with a fixed cool-down
//! - [`progress`] - observable run state and derived counts
//! - [`retry`] - failure classification and bounded retry of transient errors
//! - [`work_item`] - items and their outcomes

pub mod progress;
pub mod retry;
pub mod runner;
pub mod work_item;

pub use progress::{ProgressEntry, ProgressReporter, RunProgress};
pub use retry::{FailureKind, ItemError, RetryPolicy};
pub use runner::{ItemExecutor, RunSummary, RunnerConfig, SequentialRunner, StartRejected};
pub use work_item::{format_metrics, ItemResult, ItemStatus, Metrics, WorkItem};
