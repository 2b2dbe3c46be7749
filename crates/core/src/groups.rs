#![forbid(unsafe_code)]

use crate::window::SeriesWindow;
use std::collections::BTreeMap;

/// Number of samples kept per series (the chart x-axis length).
pub const X_AXIS_LENGTH: usize = 75;

/// Data-point radius used when data points are shown.
pub const POINT_SIZE: u32 = 2;

/// Latest raw values for one group as returned by the backend.
pub type RawSample = BTreeMap<String, f64>;

/// Backend payload for one poll: group name -> raw sample.
pub type StatsResponse = BTreeMap<String, RawSample>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: &'static str,
    pub chart_id: &'static str,
    pub labels: &'static [&'static str],
    pub title: &'static str,
    /// Title when a database is selected.
    pub database_title: &'static str,
    /// Cumulative counters; samples are deltas against a baseline.
    pub counter: bool,
}

impl GroupSpec {
    pub fn title_for(&self, database: bool) -> &'static str {
        if database {
            self.database_title
        } else {
            self.title
        }
    }

    /// Empty windows for every label of this group.
    pub fn defaults(&self) -> GroupWindows {
        GroupWindows::with_labels(self.labels.iter().copied(), X_AXIS_LENGTH)
    }
}

pub const SESSION_STATS: GroupSpec = GroupSpec {
    name: "session_stats",
    chart_id: "sessions-graph",
    labels: &["Total", "Active", "Idle"],
    title: "Server sessions",
    database_title: "Database sessions",
    counter: false,
};

pub const TPS_STATS: GroupSpec = GroupSpec {
    name: "tps_stats",
    chart_id: "tps-graph",
    labels: &["Transactions", "Commits", "Rollbacks"],
    title: "Transactions per second",
    database_title: "Transactions per second",
    counter: true,
};

pub const TI_STATS: GroupSpec = GroupSpec {
    name: "ti_stats",
    chart_id: "ti-graph",
    labels: &["Inserts", "Updates", "Delete"],
    title: "Tuples in",
    database_title: "Tuples in",
    counter: true,
};

pub const TO_STATS: GroupSpec = GroupSpec {
    name: "to_stats",
    chart_id: "to-graph",
    labels: &["Fetched", "Returned"],
    title: "Tuples out",
    database_title: "Tuples out",
    counter: true,
};

pub const BIO_STATS: GroupSpec = GroupSpec {
    name: "bio_stats",
    chart_id: "bio-graph",
    labels: &["Reads", "Hits"],
    title: "Block I/O",
    database_title: "Block I/O",
    counter: true,
};

/// Dashboard groups in display order.
pub static BUILTIN_GROUPS: [GroupSpec; 5] = [SESSION_STATS, TPS_STATS, TI_STATS, TO_STATS, BIO_STATS];

pub fn find_group(name: &str) -> Option<&'static GroupSpec> {
    BUILTIN_GROUPS.iter().find(|spec| spec.name == name)
}

/// Ordered label -> window mapping for one group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupWindows {
    capacity: usize,
    series: Vec<(String, SeriesWindow)>,
}

impl GroupWindows {
    pub fn with_labels<'a>(labels: impl IntoIterator<Item = &'a str>, capacity: usize) -> Self {
        let series = labels
            .into_iter()
            .map(|label| (label.to_string(), SeriesWindow::new(capacity)))
            .collect();
        Self { capacity, series }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, label: &str) -> Option<&SeriesWindow> {
        self.series
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, window)| window)
    }

    /// Window for `label`, appended at the end when the label is new.
    pub fn entry(&mut self, label: &str) -> &mut SeriesWindow {
        let index = match self.series.iter().position(|(name, _)| name == label) {
            Some(index) => index,
            None => {
                self.series
                    .push((label.to_string(), SeriesWindow::new(self.capacity)));
                self.series.len() - 1
            }
        };
        &mut self.series[index].1
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SeriesWindow)> + '_ {
        self.series
            .iter()
            .map(|(name, window)| (name.as_str(), window))
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|(_, window)| window.is_empty())
    }
}
