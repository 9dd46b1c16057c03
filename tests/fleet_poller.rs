//! Status poller behaviour against a scripted backend

use async_trait::async_trait;
use memodrops::api::ApiError;
use memodrops::fleet::{
    poll_once, FleetBackend, FleetStatus, GlobalState, PollStats, StatusPoller, UnitState,
    UnitStatus,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

/// Replays queued replies; once drained keeps answering with the last one
struct ScriptedFleet {
    replies: Mutex<VecDeque<Result<FleetStatus, ApiError>>>,
    last: Mutex<Option<FleetStatus>>,
    latency: Duration,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    start_all_calls: AtomicUsize,
}

impl ScriptedFleet {
    fn new(replies: Vec<Result<FleetStatus, ApiError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            latency: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            start_all_calls: AtomicUsize::new(0),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FleetBackend for ScriptedFleet {
    async fn fetch_status(&self) -> Result<FleetStatus, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(status)) => {
                *self.last.lock().unwrap() = Some(status.clone());
                Ok(status)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ApiError::Transport("no scripted reply".into())),
        }
    }

    async fn start_all(&self) -> Result<(), ApiError> {
        self.start_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn unit(name: &str, status: UnitState, saved: i64) -> UnitStatus {
    UnitStatus {
        unit_name: name.to_string(),
        status,
        progress_percent: 50.0,
        found_count: saved + 2,
        saved_count: saved,
        message: Some(format!("{} página 1", name)),
        last_run_at: None,
    }
}

fn busy_fleet() -> FleetStatus {
    FleetStatus {
        units: vec![
            unit("cebraspe", UnitState::Running, 10),
            unit("fgv", UnitState::Error, 0),
        ],
        global_status: GlobalState::Running,
        recent_log_lines: vec!["cebraspe: iniciado".into(), "fgv: timeout".into()],
    }
}

fn finished_fleet() -> FleetStatus {
    FleetStatus {
        units: vec![unit("vunesp", UnitState::Completed, 42)],
        global_status: GlobalState::Completed,
        recent_log_lines: Vec::new(),
    }
}

#[tokio::test]
async fn test_failed_tick_keeps_snapshot_byte_for_byte() {
    let backend = ScriptedFleet::new(vec![
        Ok(busy_fleet()),
        Err(ApiError::Transport("connection refused".into())),
        Err(ApiError::Http {
            status: 500,
            message: "Internal error".into(),
        }),
    ]);
    let (tx, rx) = watch::channel(None);
    let stats = PollStats::default();

    assert!(poll_once(&backend, &tx, &stats).await);
    let before = serde_json::to_vec(&*rx.borrow()).unwrap();

    assert!(!poll_once(&backend, &tx, &stats).await);
    assert!(!poll_once(&backend, &tx, &stats).await);
    let after = serde_json::to_vec(&*rx.borrow()).unwrap();

    assert_eq!(before, after);
    assert_eq!(stats.ticks(), 3);
    assert_eq!(stats.failed_ticks(), 2);
}

#[tokio::test]
async fn test_failure_before_first_success_leaves_no_snapshot() {
    let backend = ScriptedFleet::new(vec![Err(ApiError::Timeout)]);
    let (tx, rx) = watch::channel(None);
    let stats = PollStats::default();

    assert!(!poll_once(&backend, &tx, &stats).await);
    assert!(rx.borrow().is_none());
}

#[tokio::test]
async fn test_successful_tick_replaces_whole_snapshot() {
    let backend = ScriptedFleet::new(vec![Ok(busy_fleet()), Ok(finished_fleet())]);
    let (tx, rx) = watch::channel(None);
    let stats = PollStats::default();

    poll_once(&backend, &tx, &stats).await;
    poll_once(&backend, &tx, &stats).await;

    // nothing from the first payload survives
    assert_eq!(*rx.borrow(), Some(finished_fleet()));
}

#[tokio::test(start_paused = true)]
async fn test_polls_at_fixed_interval_until_stopped() {
    let backend = Arc::new(ScriptedFleet::new(vec![Ok(busy_fleet())]));
    let mut poller = StatusPoller::new(backend.clone());

    poller.start_polling(Duration::from_millis(3000));
    assert!(poller.is_polling());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.fetches(), 1);
    assert_eq!(poller.snapshot(), Some(busy_fleet()));

    sleep(Duration::from_millis(3000)).await;
    assert_eq!(backend.fetches(), 2);

    // second start is a no-op
    poller.start_polling(Duration::from_millis(10));
    sleep(Duration::from_millis(3000)).await;
    assert_eq!(backend.fetches(), 3);

    poller.stop_polling();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.fetches(), 3);
    assert!(!poller.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_cuts_the_wait_short() {
    let backend = Arc::new(ScriptedFleet::new(vec![Ok(busy_fleet()), Ok(finished_fleet())]));
    let mut poller = StatusPoller::new(backend.clone());
    poller.start_polling(Duration::from_secs(60));

    sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.fetches(), 1);

    poller.refresh_now();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.fetches(), 2);
    assert_eq!(poller.snapshot(), Some(finished_fleet()));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_never_overlap() {
    let backend = Arc::new(
        ScriptedFleet::new(vec![Ok(busy_fleet())]).with_latency(Duration::from_secs(5)),
    );
    let mut poller = StatusPoller::new(backend.clone());
    poller.start_polling(Duration::from_millis(100));

    for _ in 0..5 {
        sleep(Duration::from_millis(700)).await;
        poller.refresh_now();
    }
    sleep(Duration::from_secs(20)).await;
    poller.stop_polling();

    assert!(backend.fetches() >= 2);
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_trigger_scrape_all_does_not_touch_snapshot() {
    let backend = Arc::new(ScriptedFleet::new(Vec::new()));
    let poller = StatusPoller::new(backend.clone());

    poller.trigger_scrape_all().await.unwrap().unwrap();

    assert_eq!(backend.start_all_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.fetches(), 0);
    assert_eq!(poller.snapshot(), None);
}
