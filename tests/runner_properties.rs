//! Behaviour of the sequential runner against scripted executors

use async_trait::async_trait;
use memodrops::batch::runner::CANCELLED_REASON;
use memodrops::batch::{
    ItemError, ItemExecutor, ItemStatus, Metrics, RetryPolicy, RunProgress, RunnerConfig,
    SequentialRunner, StartRejected, WorkItem,
};
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug, Clone)]
struct Call {
    id: String,
    started: Instant,
    finished: Instant,
}

/// Sleeps `work` per call, fails the ids in `failing`
struct Scripted {
    work: Duration,
    failing: HashSet<String>,
    started: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
}

impl Scripted {
    fn new(work: Duration) -> Self {
        Self {
            work,
            failing: HashSet::new(),
            started: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    fn started_ids(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemExecutor for Scripted {
    async fn execute(&self, item: &WorkItem) -> Result<Metrics, ItemError> {
        self.started.lock().unwrap().push(item.id.clone());
        let started = Instant::now();
        sleep(self.work).await;
        self.calls.lock().unwrap().push(Call {
            id: item.id.clone(),
            started,
            finished: Instant::now(),
        });

        if self.failing.contains(&item.id) {
            return Err(ItemError::terminal(format!("contest {} rejected", item.id)));
        }
        let mut metrics = Metrics::new();
        metrics.insert("subtopicos_processados".to_string(), 3);
        Ok(metrics)
    }
}

fn items(ids: &[&str]) -> Vec<WorkItem> {
    ids.iter()
        .map(|id| WorkItem::new(*id, format!("Concurso {}", id), format!("https://x/{}.pdf", id)))
        .collect()
}

fn runner(delay_ms: u64) -> SequentialRunner {
    SequentialRunner::new(RunnerConfig {
        delay: Duration::from_millis(delay_ms),
        item_timeout: None,
        retry: RetryPolicy::none(),
    })
}

fn statuses(progress: &RunProgress) -> Vec<&'static str> {
    progress.items.iter().map(|e| e.status.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_every_item_is_terminal_after_completion() {
    let runner = runner(100);
    let exec = Scripted::new(Duration::from_millis(50)).failing("b");

    let summary = runner.start(items(&["a", "b", "c", "d"]), &exec).await.unwrap();

    assert!(summary.progress.is_complete());
    assert!(summary.progress.invariants_hold());
    assert!(!summary.cancelled);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.progress.percent_complete(), 100.0);

    let after = runner.progress();
    assert!(!after.is_running);
    assert!(!runner.is_running());
    assert!(after.finished_at.is_some());
    assert_eq!(after.current_index, Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_running_item_and_it_is_current() {
    let runner = runner(200);
    let exec = Scripted::new(Duration::from_millis(100));
    let mut rx = runner.subscribe();

    let watcher = async {
        let mut observed = 0;
        loop {
            if rx.changed().await.is_err() {
                break;
            }
            let snapshot = rx.borrow_and_update().clone();
            observed += 1;
            assert!(snapshot.running_count() <= 1, "{:?}", statuses(&snapshot));
            if snapshot.running_count() == 1 {
                let current = snapshot.current_index.expect("running item without index");
                assert_eq!(snapshot.items[current].status, ItemStatus::Running);
            }
            assert!(snapshot.invariants_hold(), "{:?}", statuses(&snapshot));
            if snapshot.finished_at.is_some() {
                break;
            }
        }
        observed
    };

    let (summary, observed) = tokio::join!(runner.start(items(&["a", "b", "c"]), &exec), watcher);
    assert!(summary.is_ok());
    assert!(observed >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_start_is_rejected() {
    let runner = runner(500);
    let exec = Scripted::new(Duration::from_millis(300));
    let list = items(&["a", "b", "c"]);

    let first = runner.start(list.clone(), &exec);
    let second = async {
        sleep(Duration::from_millis(100)).await;
        runner.start(list.clone(), &exec).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), StartRejected::AlreadyRunning);

    // one sequence of calls, never interleaved
    assert_eq!(exec.started_ids(), vec!["a", "b", "c"]);
    let calls = exec.calls();
    for pair in calls.windows(2) {
        assert!(pair[0].finished <= pair[1].started);
    }
}

#[tokio::test]
async fn test_empty_list_is_rejected_without_touching_progress() {
    let runner = runner(0);
    let exec = Scripted::new(Duration::ZERO);

    assert_eq!(runner.start(Vec::new(), &exec).await.unwrap_err(), StartRejected::Empty);
    assert_eq!(runner.progress(), RunProgress::default());
    assert!(exec.started_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_stop_the_run() {
    let runner = runner(10);
    let exec = Scripted::new(Duration::from_millis(10)).failing("b");

    let summary = runner.start(items(&["a", "b", "c"]), &exec).await.unwrap();

    assert_eq!(statuses(&summary.progress), vec!["success", "failure", "success"]);
    assert_eq!(
        summary.progress.items[1].status,
        ItemStatus::Failure {
            reason: "contest b rejected".to_string()
        }
    );
    assert_eq!(exec.started_ids(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_separates_items() {
    let runner = runner(2000);
    let exec = Scripted::new(Duration::from_millis(10));

    let t0 = Instant::now();
    runner.start(items(&["a", "b", "c"]), &exec).await.unwrap();
    let elapsed = t0.elapsed();

    assert!(elapsed >= Duration::from_millis(4000), "elapsed {:?}", elapsed);
    // no pause after the last item
    assert!(elapsed < Duration::from_millis(6000), "elapsed {:?}", elapsed);

    let calls = exec.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].started - pair[0].finished >= Duration::from_millis(2000));
    }
    assert_eq!(
        calls.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_pause_stops_scheduling() {
    let runner = runner(2000);
    let exec = Scripted::new(Duration::from_millis(1000));

    let cancel = async {
        sleep(Duration::from_millis(1500)).await;
        assert!(runner.cancel());
    };
    let (summary, ()) = tokio::join!(runner.start(items(&["a", "b", "c", "d", "e"]), &exec), cancel);
    let summary = summary.unwrap();

    assert!(summary.cancelled);
    assert_eq!(statuses(&summary.progress), vec!["success", "pending", "pending", "pending", "pending"]);
    assert_eq!(summary.skipped, 4);
    assert_eq!(exec.started_ids(), vec!["a"]);
    assert!(runner.progress().cancelled);
    assert!(!runner.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_aborts_in_flight_item() {
    let runner = runner(2000);
    let exec = Scripted::new(Duration::from_millis(1000));

    let cancel = async {
        sleep(Duration::from_millis(500)).await;
        assert!(runner.cancel());
    };
    let (summary, ()) = tokio::join!(runner.start(items(&["a", "b", "c"]), &exec), cancel);
    let summary = summary.unwrap();

    assert_eq!(
        summary.progress.items[0].status,
        ItemStatus::Failure {
            reason: CANCELLED_REASON.to_string()
        }
    );
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert!(exec.calls().is_empty());
    assert!(summary.progress.invariants_hold());
}

#[tokio::test(start_paused = true)]
async fn test_slow_item_times_out() {
    let runner = SequentialRunner::new(RunnerConfig {
        delay: Duration::from_millis(10),
        item_timeout: Some(Duration::from_secs(1)),
        retry: RetryPolicy::none(),
    });
    let exec = Scripted::new(Duration::from_secs(5));

    let summary = runner.start(items(&["a"]), &exec).await.unwrap();

    assert_eq!(
        summary.progress.items[0].status,
        ItemStatus::Failure {
            reason: "timed out after 1000 ms".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_each_start_reprocesses_every_item() {
    let runner = runner(10);
    let exec = Scripted::new(Duration::from_millis(10)).failing("b");
    let list = items(&["a", "b", "c"]);

    let first = runner.start(list.clone(), &exec).await.unwrap();
    let second = runner.start(list, &exec).await.unwrap();

    assert_eq!(exec.started_ids(), vec!["a", "b", "c", "a", "b", "c"]);
    assert_eq!(statuses(&first.progress), statuses(&second.progress));
    assert!(second.started_at >= first.finished_at);
}
