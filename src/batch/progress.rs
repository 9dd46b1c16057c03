//! Run progress state and the reporter that publishes it
//!
//! [`RunProgress`] is a passive container: the runner writes into it through a
//! [`ProgressReporter`], viewers read snapshots from a `watch` receiver. Every
//! write is published before the runner moves on, so a viewer always sees an
//! item as `Running` before its executor call starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::work_item::{ItemResult, ItemStatus, WorkItem};

/// One row of the progress table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub item: WorkItem,
    pub status: ItemStatus,
}

/// Observable state of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub items: Vec<ProgressEntry>,
    /// Index of the item being (or last) processed; `None` before the first item
    pub current_index: Option<usize>,
    pub is_running: bool,
    /// Set when the run stopped because of a cancel request
    pub cancelled: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunProgress {
    /// All items Pending, nothing running yet
    pub fn pending(items: &[WorkItem]) -> Self {
        Self {
            items: items
                .iter()
                .cloned()
                .map(|item| ProgressEntry {
                    item,
                    status: ItemStatus::Pending,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Success { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failure { .. }))
    }

    pub fn pending_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Pending))
    }

    pub fn running_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Running))
    }

    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.items.iter().filter(|e| pred(&e.status)).count()
    }

    /// `(current_index + 1) / total * 100`, clamped to `[0, 100]`
    pub fn percent_complete(&self) -> f64 {
        match self.current_index {
            Some(idx) if self.total() > 0 => {
                ((idx + 1) as f64 / self.total() as f64 * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        }
    }

    /// True once every item carries a terminal status
    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|e| e.status.is_terminal())
    }

    /// Checks the ordering invariant: terminal left of `current_index`,
    /// Pending right of it, and at most one Running which sits at `current_index`.
    pub fn invariants_hold(&self) -> bool {
        if self.running_count() > 1 {
            return false;
        }
        match self.current_index {
            None => self.items.iter().all(|e| e.status == ItemStatus::Pending),
            Some(cur) => self.items.iter().enumerate().all(|(i, e)| {
                if i < cur {
                    e.status.is_terminal()
                } else if i > cur {
                    e.status == ItemStatus::Pending
                } else {
                    e.status != ItemStatus::Pending
                }
            }),
        }
    }

    fn mark_running(&mut self, index: usize) -> bool {
        let expected = self.current_index.map_or(0, |i| i + 1);
        if index != expected {
            return false;
        }
        if let Some(cur) = self.current_index {
            if !self.items[cur].status.is_terminal() {
                return false;
            }
        }
        match self.items.get_mut(index) {
            Some(entry) if entry.status == ItemStatus::Pending => {
                entry.status = ItemStatus::Running;
                self.current_index = Some(index);
                true
            }
            _ => false,
        }
    }

    fn record(&mut self, index: usize, result: ItemResult) -> bool {
        match self.items.get_mut(index) {
            Some(entry) if entry.status == ItemStatus::Running => {
                entry.status = result.into();
                true
            }
            _ => false,
        }
    }
}

/// Write side of a run's progress
///
/// Owned by the runner; viewers call [`ProgressReporter::subscribe`].
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<RunProgress>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunProgress::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.tx.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> RunProgress {
        self.tx.borrow().clone()
    }

    /// Replace any previous run with a fresh all-Pending one and mark it running
    pub(crate) fn begin(&self, items: &[WorkItem]) {
        let mut fresh = RunProgress::pending(items);
        fresh.is_running = true;
        fresh.started_at = Some(Utc::now());
        self.tx.send_replace(fresh);
    }

    pub(crate) fn mark_running(&self, index: usize) -> bool {
        let mut changed = false;
        self.tx.send_if_modified(|p| {
            changed = p.mark_running(index);
            changed
        });
        changed
    }

    pub(crate) fn record(&self, index: usize, result: ItemResult) -> bool {
        let mut changed = false;
        self.tx.send_if_modified(|p| {
            changed = p.record(index, result);
            changed
        });
        changed
    }

    pub(crate) fn finish(&self, cancelled: bool) {
        self.tx.send_modify(|p| {
            p.is_running = false;
            p.cancelled = cancelled;
            p.finished_at = Some(Utc::now());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::work_item::Metrics;

    fn items(n: usize) -> Vec<WorkItem> {
        (0..n)
            .map(|i| WorkItem::new(format!("c{}", i), format!("Concurso {}", i), "http://x/e.pdf"))
            .collect()
    }

    #[test]
    fn test_pending_state_renders_without_special_case() {
        let p = RunProgress::pending(&items(3));
        assert_eq!(p.total(), 3);
        assert_eq!(p.pending_count(), 3);
        assert_eq!(p.succeeded_count(), 0);
        assert_eq!(p.percent_complete(), 0.0);
        assert!(p.invariants_hold());
        assert!(!p.is_complete());
    }

    #[test]
    fn test_empty_progress_percent_is_zero() {
        let p = RunProgress::default();
        assert_eq!(p.percent_complete(), 0.0);
        assert!(!p.is_complete());
    }

    #[test]
    fn test_mark_running_must_follow_order() {
        let mut p = RunProgress::pending(&items(3));
        assert!(!p.mark_running(1));
        assert!(p.mark_running(0));
        // item 0 still Running
        assert!(!p.mark_running(1));
        assert!(p.record(0, ItemResult::failure("x")));
        assert!(p.mark_running(1));
        assert!(p.invariants_hold());
        assert!((p.percent_complete() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_result_is_written_once() {
        let mut p = RunProgress::pending(&items(1));
        p.mark_running(0);
        assert!(p.record(0, ItemResult::success(Metrics::new())));
        assert!(!p.record(0, ItemResult::failure("late")));
        assert_eq!(p.succeeded_count(), 1);
        assert!(p.is_complete());
        assert_eq!(p.percent_complete(), 100.0);
    }

    #[test]
    fn test_invariants_detect_gaps() {
        let mut p = RunProgress::pending(&items(3));
        p.current_index = Some(1);
        p.items[1].status = ItemStatus::Running;
        // Item 0 left Pending behind current_index
        assert!(!p.invariants_hold());
    }

    #[tokio::test]
    async fn test_reporter_publishes_each_step() {
        let reporter = ProgressReporter::new();
        let mut rx = reporter.subscribe();

        reporter.begin(&items(2));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_running);

        reporter.mark_running(0);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().items[0].status, ItemStatus::Running);

        reporter.record(0, ItemResult::failure("nope"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().failed_count(), 1);

        reporter.finish(false);
        rx.changed().await.unwrap();
        let last = rx.borrow_and_update().clone();
        assert!(!last.is_running);
        assert!(last.finished_at.is_some());
    }
}
