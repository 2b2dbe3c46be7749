#![forbid(unsafe_code)]

use crate::failure::{FailureKind, FetchFailure};
use crate::groups::{BUILTIN_GROUPS, GroupSpec, GroupWindows, RawSample, StatsResponse};
use crate::reducer::{SeriesEvent, reduce};
use crate::render::{ChartData, DisplayOptions, chart_data};
use crate::schedule::{RefreshSchedule, poll_delay_ms};
use crate::visibility::VisibilityGate;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Refresh interval in seconds, keyed by group name.
    pub intervals: BTreeMap<String, u64>,
    pub display: DisplayOptions,
}

impl DashboardConfig {
    /// Every built-in group refreshed every `seconds`.
    pub fn uniform(seconds: u64) -> Self {
        Self {
            intervals: BUILTIN_GROUPS
                .iter()
                .map(|spec| (spec.name.to_string(), seconds))
                .collect(),
            display: DisplayOptions::default(),
        }
    }

    pub fn with_interval(mut self, group: &str, seconds: u64) -> Self {
        self.intervals.insert(group.to_string(), seconds);
        self
    }

    fn interval_for(&self, spec: &GroupSpec) -> Result<u64, ConfigError> {
        match self.intervals.get(spec.name).copied() {
            None => Err(ConfigError::MissingInterval { group: spec.name }),
            Some(0) => Err(ConfigError::ZeroInterval { group: spec.name }),
            Some(seconds) => Ok(seconds),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingInterval { group: &'static str },
    ZeroInterval { group: &'static str },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInterval { group } => write!(f, "missing {group}_refresh"),
            Self::ZeroInterval { group } => write!(f, "{group}_refresh must be at least 1 second"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, PartialEq)]
struct GroupState {
    spec: &'static GroupSpec,
    interval_s: u64,
    windows: GroupWindows,
    baseline: Option<RawSample>,
}

impl GroupState {
    fn reset(&mut self) {
        self.windows = reduce(&self.windows, SeriesEvent::Reset(&self.spec.defaults()));
        self.baseline = None;
    }
}

/// One batched fetch, identified by its generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollRequest {
    pub generation: u64,
    pub groups: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed { kind: FailureKind, reset: bool },
    /// A latched error is already displayed.
    Suppressed { kind: FailureKind },
    /// Not the outstanding request, or arrived after stop.
    Stale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigChange {
    pub reset_groups: usize,
    pub poll_delay_changed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartPanel {
    pub chart_id: &'static str,
    pub title: &'static str,
    pub data: ChartData,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub poll_delay_ms: u64,
    pub error: Option<&'static str>,
    pub display: DisplayOptions,
    /// Absent until the dashboard has been visible once.
    pub charts: Option<Vec<ChartPanel>>,
}

/// Owns every group's windows, baselines, schedule and the displayed error.
///
/// All mutation goes through `begin_tick`, `complete`, `apply_config`,
/// `set_visible` and `stop`; the caller serializes those calls.
#[derive(Clone, Debug)]
pub struct Dashboard {
    groups: Vec<GroupState>,
    schedule: RefreshSchedule,
    poll_delay_ms: u64,
    display: DisplayOptions,
    database: bool,
    error: Option<&'static str>,
    error_latched: bool,
    gate: VisibilityGate,
    in_flight: Option<PollRequest>,
    pending: Vec<String>,
    next_generation: u64,
    stopped: bool,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig, database: bool) -> Result<Self, ConfigError> {
        let mut groups = Vec::with_capacity(BUILTIN_GROUPS.len());
        for spec in BUILTIN_GROUPS.iter() {
            groups.push(GroupState {
                spec,
                interval_s: config.interval_for(spec)?,
                windows: spec.defaults(),
                baseline: None,
            });
        }
        let poll_delay_ms = shared_delay(&groups);
        Ok(Self {
            groups,
            schedule: RefreshSchedule::new(),
            poll_delay_ms,
            display: config.display,
            database,
            error: None,
            error_latched: false,
            gate: VisibilityGate::new(),
            in_flight: None,
            pending: Vec::new(),
            next_generation: 1,
            stopped: false,
        })
    }

    pub fn poll_delay_ms(&self) -> u64 {
        self.poll_delay_ms
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error
    }

    pub fn windows(&self, group: &str) -> Option<&GroupWindows> {
        self.group(group).map(|state| &state.windows)
    }

    pub fn baseline(&self, group: &str) -> Option<&RawSample> {
        self.group(group).and_then(|state| state.baseline.as_ref())
    }

    pub fn interval(&self, group: &str) -> Option<u64> {
        self.group(group).map(|state| state.interval_s)
    }

    pub fn in_flight(&self) -> Option<&PollRequest> {
        self.in_flight.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn group(&self, name: &str) -> Option<&GroupState> {
        self.groups.iter().find(|state| state.spec.name == name)
    }

    /// Applies new preferences. Groups whose interval changed lose their
    /// history and become due on the next tick.
    pub fn apply_config(&mut self, config: &DashboardConfig) -> Result<ConfigChange, ConfigError> {
        let mut intervals = Vec::with_capacity(self.groups.len());
        for state in &self.groups {
            intervals.push(config.interval_for(state.spec)?);
        }

        let mut reset_groups = 0;
        for (state, interval_s) in self.groups.iter_mut().zip(intervals) {
            if state.interval_s != interval_s {
                state.interval_s = interval_s;
                state.reset();
                self.schedule.forget(state.spec.name);
                reset_groups += 1;
            }
        }
        self.display = config.display;

        let delay = shared_delay(&self.groups);
        let poll_delay_changed = delay != self.poll_delay_ms;
        self.poll_delay_ms = delay;
        Ok(ConfigChange {
            reset_groups,
            poll_delay_changed,
        })
    }

    /// Plans the fetch for the tick at epoch `now` (seconds).
    ///
    /// Returns `None` when no group is due or a request is still unanswered.
    /// Groups that fall due while a request is outstanding are held back and
    /// sent with the first tick after its reply.
    pub fn begin_tick(&mut self, now: u64) -> Option<PollRequest> {
        if self.stopped {
            return None;
        }
        let due = self.schedule.take_due(
            now,
            self.groups
                .iter()
                .map(|state| (state.spec.name, state.interval_s)),
        );
        for group in due {
            if !self.pending.contains(&group) {
                self.pending.push(group);
            }
        }
        if self.in_flight.is_some() || self.pending.is_empty() {
            return None;
        }

        let mut groups = std::mem::take(&mut self.pending);
        groups.sort_by_key(|name| {
            self.groups
                .iter()
                .position(|state| state.spec.name == name.as_str())
                .unwrap_or(usize::MAX)
        });
        let request = PollRequest {
            generation: self.next_generation,
            groups,
        };
        self.next_generation += 1;
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Groups due but waiting for the outstanding request to finish.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Applies the outcome of request `generation`.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<StatsResponse, FetchFailure>,
    ) -> Completion {
        if self.stopped {
            return Completion::Stale;
        }
        match &self.in_flight {
            Some(request) if request.generation == generation => {}
            _ => return Completion::Stale,
        }
        self.in_flight = None;

        match result {
            Ok(response) => {
                self.apply_response(&response);
                Completion::Applied
            }
            Err(failure) => self.apply_failure(&failure),
        }
    }

    fn apply_response(&mut self, response: &StatsResponse) {
        self.error = None;
        self.error_latched = false;
        for state in &mut self.groups {
            let event = SeriesEvent::from_incoming(
                response.get(state.spec.name),
                state.spec.counter,
                state.baseline.as_ref(),
            );
            state.windows = reduce(&state.windows, event);
        }
        for state in &mut self.groups {
            if !state.spec.counter {
                continue;
            }
            if let Some(raw) = response.get(state.spec.name) {
                state.baseline = Some(raw.clone());
            }
        }
    }

    fn apply_failure(&mut self, failure: &FetchFailure) -> Completion {
        let kind = failure.kind();
        if self.error_latched {
            return Completion::Suppressed { kind };
        }
        let Some(message) = kind.message() else {
            return Completion::Failed { kind, reset: false };
        };
        let reset = kind.resets_state();
        if reset {
            for state in &mut self.groups {
                state.reset();
            }
            self.error_latched = true;
        }
        self.error = Some(message);
        Completion::Failed { kind, reset }
    }

    /// Returns `true` when this call made the charts renderable.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        self.gate.observe(visible)
    }

    pub fn is_drawn(&self) -> bool {
        self.gate.is_open()
    }

    /// Tears the dashboard down; later completions are ignored.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.in_flight = None;
        self.pending.clear();
        for state in &mut self.groups {
            state.reset();
        }
        self.schedule.clear();
    }

    pub fn view(&self) -> DashboardView {
        let charts = self.gate.is_open().then(|| {
            self.groups
                .iter()
                .map(|state| ChartPanel {
                    chart_id: state.spec.chart_id,
                    title: state.spec.title_for(self.database),
                    data: chart_data(&state.windows, state.interval_s),
                })
                .collect::<Vec<_>>()
        });
        DashboardView {
            poll_delay_ms: self.poll_delay_ms,
            error: self.error,
            display: self.display,
            charts,
        }
    }
}

fn shared_delay(groups: &[GroupState]) -> u64 {
    // Intervals are validated non-zero, so the gcd exists.
    poll_delay_ms(groups.iter().map(|state| state.interval_s)).unwrap_or(1000)
}
