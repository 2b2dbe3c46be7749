#![forbid(unsafe_code)]

//! Polling and reduction logic behind the server/database statistics graphs.
//!
//! Nothing here performs I/O: the poller crate feeds ticks and fetch results
//! into a [`dashboard::Dashboard`] and renders its [`dashboard::DashboardView`].

pub mod dashboard;
pub mod failure;
pub mod groups;
pub mod reducer;
pub mod render;
pub mod schedule;
pub mod visibility;
pub mod window;

pub use dashboard::{
    ChartPanel, Completion, ConfigChange, ConfigError, Dashboard, DashboardConfig, DashboardView,
    PollRequest,
};
pub use failure::{FailureKind, FetchFailure};
pub use groups::{BUILTIN_GROUPS, GroupSpec, GroupWindows, RawSample, StatsResponse, X_AXIS_LENGTH};
pub use render::DisplayOptions;
