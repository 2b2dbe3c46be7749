#![forbid(unsafe_code)]

pub mod config;
pub mod dto;
pub mod error;
pub mod fetch;
pub mod runtime;
pub mod time;

pub use config::{ParsedArgs, PollerConfig, Preferences, parse_args, usage};
pub use error::{ConfigError, PollerError};
pub use fetch::{HttpFetcher, StatsFetcher};
pub use runtime::{EpochClock, PollerHandle, PollerUpdate, SystemClock, UpdateCause, spawn};
