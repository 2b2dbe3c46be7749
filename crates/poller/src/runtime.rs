#![forbid(unsafe_code)]

use crate::error::PollerError;
use crate::fetch::StatsFetcher;
use dash_core::{
    Completion, Dashboard, DashboardConfig, DashboardView, FailureKind, FetchFailure, PollRequest,
    StatsResponse,
};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Source of the scheduling epoch (whole seconds).
pub trait EpochClock: Send + 'static {
    fn now_epoch(&self) -> u64;
}

pub struct SystemClock;

impl EpochClock for SystemClock {
    fn now_epoch(&self) -> u64 {
        crate::time::now_epoch_s()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateCause {
    Started,
    Fetched,
    FetchFailed,
    Preferences,
    Visibility,
}

impl UpdateCause {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Fetched => "fetched",
            Self::FetchFailed => "fetch_failed",
            Self::Preferences => "preferences",
            Self::Visibility => "visibility",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PollerUpdate {
    pub cause: UpdateCause,
    pub view: DashboardView,
}

enum LoopEvent {
    Fetched {
        generation: u64,
        result: Result<StatsResponse, FetchFailure>,
    },
    Preferences(DashboardConfig),
    Visible(bool),
    Stop,
}

/// Handle to a running poller. Dropping it stops the loop.
pub struct PollerHandle {
    tx: Sender<LoopEvent>,
    join: Option<JoinHandle<()>>,
    latest: Arc<Mutex<Option<DashboardView>>>,
}

impl PollerHandle {
    pub fn set_visible(&self, visible: bool) -> Result<(), PollerError> {
        self.send(LoopEvent::Visible(visible))
    }

    pub fn update_preferences(&self, config: DashboardConfig) -> Result<(), PollerError> {
        self.send(LoopEvent::Preferences(config))
    }

    pub fn latest_view(&self) -> Option<DashboardView> {
        match self.latest.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stops the timer and waits for the loop to exit. In-flight results are discarded.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn send(&self, event: LoopEvent) -> Result<(), PollerError> {
        self.tx.send(event).map_err(|_| PollerError::Stopped)
    }

    fn shutdown(&mut self) {
        let _ = self.tx.send(LoopEvent::Stop);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            error!("poller loop panicked");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts the poll loop on its own thread. The first tick fires immediately.
///
/// `sink` runs on the loop thread after every state change.
pub fn spawn<F, C, S>(
    dashboard: Dashboard,
    fetcher: Arc<F>,
    clock: C,
    sink: S,
) -> Result<PollerHandle, PollerError>
where
    F: StatsFetcher,
    C: EpochClock,
    S: FnMut(PollerUpdate) + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let latest = Arc::new(Mutex::new(None));
    let state = LoopState {
        dashboard,
        fetcher,
        clock,
        sink,
        tx: tx.clone(),
        latest: Arc::clone(&latest),
    };
    let join = thread::Builder::new()
        .name("dash-poller".to_string())
        .spawn(move || state.run(rx))
        .map_err(PollerError::Spawn)?;
    Ok(PollerHandle {
        tx,
        join: Some(join),
        latest,
    })
}

struct LoopState<F, C, S> {
    dashboard: Dashboard,
    fetcher: Arc<F>,
    clock: C,
    sink: S,
    tx: Sender<LoopEvent>,
    latest: Arc<Mutex<Option<DashboardView>>>,
}

impl<F, C, S> LoopState<F, C, S>
where
    F: StatsFetcher,
    C: EpochClock,
    S: FnMut(PollerUpdate) + Send + 'static,
{
    fn run(mut self, rx: Receiver<LoopEvent>) {
        info!(
            poll_delay_ms = self.dashboard.poll_delay_ms(),
            "dashboard poller started"
        );
        self.publish(UpdateCause::Started);

        let mut next_tick = Instant::now();
        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            let event = match rx.recv_timeout(wait) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    let delay = self.delay();
                    next_tick += delay;
                    let now = Instant::now();
                    if next_tick <= now {
                        next_tick = now + delay;
                    }
                    self.tick();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match event {
                LoopEvent::Stop => break,
                LoopEvent::Fetched { generation, result } => self.on_fetched(generation, result),
                LoopEvent::Preferences(config) => match self.dashboard.apply_config(&config) {
                    Ok(change) => {
                        if change.poll_delay_changed {
                            next_tick = Instant::now() + self.delay();
                        }
                        info!(
                            reset_groups = change.reset_groups,
                            poll_delay_ms = self.dashboard.poll_delay_ms(),
                            "preferences applied"
                        );
                        self.publish(UpdateCause::Preferences);
                    }
                    Err(err) => warn!(%err, "preferences rejected"),
                },
                LoopEvent::Visible(visible) => {
                    if self.dashboard.set_visible(visible) {
                        debug!("dashboard drawn");
                    }
                    self.publish(UpdateCause::Visibility);
                }
            }
        }

        self.dashboard.stop();
        info!("dashboard poller stopped");
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.dashboard.poll_delay_ms())
    }

    fn tick(&mut self) {
        let Some(request) = self.dashboard.begin_tick(self.clock.now_epoch()) else {
            if let Some(outstanding) = self.dashboard.in_flight() {
                debug!(
                    generation = outstanding.generation,
                    held = self.dashboard.pending().len(),
                    "previous stats request still outstanding"
                );
            }
            return;
        };
        debug!(
            generation = request.generation,
            groups = %request.groups.join(","),
            "poll"
        );
        if let Err(err) = self.start_fetch(request.clone()) {
            error!(%err, "failed to start fetch");
            let failure = FetchFailure::Unclassified(format!("spawn fetch: {err}"));
            self.on_fetched(request.generation, Err(failure));
        }
    }

    fn start_fetch(&self, request: PollRequest) -> std::io::Result<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("dash-fetch".to_string())
            .spawn(move || {
                let result = fetcher.fetch(&request.groups);
                // The loop may already be gone; its state is torn down then.
                let _ = tx.send(LoopEvent::Fetched {
                    generation: request.generation,
                    result,
                });
            })
            .map(|_| ())
    }

    fn on_fetched(&mut self, generation: u64, result: Result<StatsResponse, FetchFailure>) {
        let failure = result.as_ref().err().cloned();
        match self.dashboard.complete(generation, result) {
            Completion::Applied => self.publish(UpdateCause::Fetched),
            Completion::Failed { kind, reset } => {
                match kind {
                    FailureKind::Unclassified => {
                        error!(generation, failure = ?failure, "unclassified stats failure")
                    }
                    _ => warn!(generation, ?kind, reset, failure = ?failure, "stats fetch failed"),
                }
                self.publish(UpdateCause::FetchFailed);
            }
            Completion::Suppressed { kind } => {
                debug!(generation, ?kind, "stats fetch failed again; error already shown")
            }
            Completion::Stale => debug!(generation, "dropping stale stats result"),
        }
    }

    fn publish(&mut self, cause: UpdateCause) {
        let view = self.dashboard.view();
        match self.latest.lock() {
            Ok(mut guard) => *guard = Some(view.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(view.clone()),
        }
        (self.sink)(PollerUpdate { cause, view });
    }
}
