#![forbid(unsafe_code)]

use dash_core::failure::PLEASE_CONNECT_MESSAGE;
use dash_core::{Dashboard, DashboardConfig, FetchFailure, RawSample, StatsResponse};
use dash_poller::{EpochClock, PollerUpdate, StatsFetcher, UpdateCause, spawn};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

struct FixedClock(u64);

impl EpochClock for FixedClock {
    fn now_epoch(&self) -> u64 {
        self.0
    }
}

/// Advances one second per tick so every group interval is honoured in
/// virtual time while the real timer runs at the shortest delay.
struct SteppingClock(AtomicU64);

impl EpochClock for SteppingClock {
    fn now_epoch(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Answers after `latency`, tracking how many calls overlap.
struct SlowFetcher {
    latency: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: Mutex<Vec<Vec<String>>>,
}

impl SlowFetcher {
    fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl StatsFetcher for SlowFetcher {
    fn fetch(&self, groups: &[String]) -> Result<StatsResponse, FetchFailure> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.calls.lock().expect("calls lock").push(groups.to_vec());
        thread::sleep(self.latency);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(sessions(2.0))
    }
}

#[derive(Default)]
struct ScriptedFetcher {
    calls: Mutex<Vec<Vec<String>>>,
    script: Mutex<VecDeque<Result<StatsResponse, FetchFailure>>>,
}

impl ScriptedFetcher {
    fn with(results: Vec<Result<StatsResponse, FetchFailure>>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(results.into()),
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl StatsFetcher for ScriptedFetcher {
    fn fetch(&self, groups: &[String]) -> Result<StatsResponse, FetchFailure> {
        self.calls.lock().expect("calls lock").push(groups.to_vec());
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(StatsResponse::new()))
    }
}

/// Blocks inside `fetch` until released, to model a slow backend.
struct GatedFetcher {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl StatsFetcher for GatedFetcher {
    fn fetch(&self, _groups: &[String]) -> Result<StatsResponse, FetchFailure> {
        let _ = self.entered.lock().expect("entered lock").send(());
        let _ = self.release.lock().expect("release lock").recv_timeout(WAIT);
        Ok(sessions(10.0))
    }
}

fn sessions(total: f64) -> StatsResponse {
    let sample: RawSample = [("Total".to_string(), total)].into_iter().collect();
    [("session_stats".to_string(), sample)].into_iter().collect()
}

fn channel_sink() -> (impl FnMut(PollerUpdate) + Send + 'static, Receiver<PollerUpdate>) {
    let (tx, rx) = mpsc::channel();
    let sink = move |update: PollerUpdate| {
        let _ = tx.send(update);
    };
    (sink, rx)
}

fn wait_for(rx: &Receiver<PollerUpdate>, cause: UpdateCause) -> PollerUpdate {
    loop {
        let update = rx.recv_timeout(WAIT).expect("poller update");
        if update.cause == cause {
            return update;
        }
    }
}

fn dashboard() -> Dashboard {
    Dashboard::new(&DashboardConfig::uniform(1), false).expect("dashboard")
}

#[test]
fn first_tick_fetches_every_group_and_merges() {
    let fetcher = ScriptedFetcher::with(vec![Ok(sessions(4.0))]);
    let (sink, rx) = channel_sink();
    let handle = spawn(dashboard(), Arc::clone(&fetcher), FixedClock(1_000), sink).expect("spawn");

    let started = wait_for(&rx, UpdateCause::Started);
    assert!(started.view.charts.is_none());

    let fetched = wait_for(&rx, UpdateCause::Fetched);
    assert_eq!(fetched.view.error, None);

    handle.set_visible(true).expect("visible");
    let visible = wait_for(&rx, UpdateCause::Visibility);
    let charts = visible.view.charts.expect("charts");
    assert_eq!(charts[0].data.datasets[0].data, vec![4.0]);

    handle.stop();
    assert!(rx.iter().all(|update| update.cause != UpdateCause::Fetched));

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 1, "fixed clock: nothing becomes due again");
    assert_eq!(calls[0].len(), 5);
}

#[test]
fn precondition_required_surfaces_connect_message() {
    let fetcher = ScriptedFetcher::with(vec![Err(FetchFailure::Status(428))]);
    let (sink, rx) = channel_sink();
    let handle = spawn(dashboard(), fetcher, FixedClock(50), sink).expect("spawn");

    let failed = wait_for(&rx, UpdateCause::FetchFailed);
    assert_eq!(failed.view.error, Some(PLEASE_CONNECT_MESSAGE));
    assert_eq!(handle.latest_view().and_then(|v| v.error), Some(PLEASE_CONNECT_MESSAGE));
    handle.stop();
}

#[test]
fn result_arriving_after_stop_is_discarded() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let fetcher = Arc::new(GatedFetcher {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let (sink, rx) = channel_sink();
    let handle = spawn(dashboard(), fetcher, FixedClock(7), sink).expect("spawn");

    entered_rx.recv_timeout(WAIT).expect("fetch started");
    handle.stop();
    let _ = release_tx.send(());

    let causes = rx.iter().map(|update| update.cause).collect::<Vec<_>>();
    assert_eq!(causes, vec![UpdateCause::Started]);
}

#[test]
fn preferences_change_poll_delay() {
    let fetcher = ScriptedFetcher::with(Vec::new());
    let (sink, rx) = channel_sink();
    let handle = spawn(dashboard(), fetcher, FixedClock(1), sink).expect("spawn");
    wait_for(&rx, UpdateCause::Started);

    handle
        .update_preferences(DashboardConfig::uniform(10).with_interval("bio_stats", 30))
        .expect("update");
    let update = wait_for(&rx, UpdateCause::Preferences);
    assert_eq!(update.view.poll_delay_ms, 10_000);
    handle.stop();
}

#[test]
fn invalid_preferences_are_ignored() {
    let fetcher = ScriptedFetcher::with(Vec::new());
    let (sink, rx) = channel_sink();
    let handle = spawn(dashboard(), fetcher, FixedClock(1), sink).expect("spawn");
    wait_for(&rx, UpdateCause::Started);

    handle
        .update_preferences(DashboardConfig::uniform(0))
        .expect("send");
    handle.set_visible(false).expect("send");
    let update = wait_for(&rx, UpdateCause::Visibility);
    assert_eq!(update.view.poll_delay_ms, 1000);
    handle.stop();
}

#[test]
fn replies_slower_than_the_tick_still_reach_the_dashboard() {
    let fetcher = SlowFetcher::new(Duration::from_millis(1_500));
    let (sink, rx) = channel_sink();
    let clock = SteppingClock(AtomicU64::new(100));
    let handle = spawn(dashboard(), Arc::clone(&fetcher), clock, sink).expect("spawn");

    wait_for(&rx, UpdateCause::Fetched);
    let second = wait_for(&rx, UpdateCause::Fetched);
    assert_eq!(second.view.error, None);
    handle.stop();

    assert_eq!(fetcher.max_active.load(Ordering::SeqCst), 1);
    let calls = fetcher.calls.lock().expect("calls lock").clone();
    assert!(calls.len() >= 2);
    assert_eq!(calls[1].len(), 5, "groups due while waiting are sent next");
}

#[test]
fn slow_group_is_not_fetched_more_often_than_its_interval() {
    let config = DashboardConfig::uniform(1).with_interval("bio_stats", 3);
    let dashboard = Dashboard::new(&config, false).expect("dashboard");
    let fetcher = ScriptedFetcher::with(Vec::new());
    let (sink, rx) = channel_sink();
    let clock = SteppingClock(AtomicU64::new(500));
    let handle = spawn(dashboard, Arc::clone(&fetcher), clock, sink).expect("spawn");

    for _ in 0..4 {
        wait_for(&rx, UpdateCause::Fetched);
    }
    handle.stop();

    let calls = fetcher.calls();
    let bio = calls
        .iter()
        .enumerate()
        .filter(|(_, groups)| groups.iter().any(|g| g == "bio_stats"))
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    assert_eq!(bio.first(), Some(&0));
    assert!(
        bio.windows(2).all(|pair| pair[1] - pair[0] >= 3),
        "bio_stats calls at {bio:?}"
    );
    assert!(calls.iter().all(|groups| groups.iter().any(|g| g == "session_stats")));
}
