#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("help requested")]
    HelpRequested,

    #[error("{flag} requires {what}")]
    MissingValue { flag: String, what: &'static str },

    #[error("{flag} must be an integer ({unit})")]
    InvalidNumber { flag: String, unit: &'static str },

    #[error("unknown arg: {0}")]
    UnknownArg(String),

    #[error("invalid base url: {0} (expected http:// or https://)")]
    InvalidBaseUrl(String),

    #[error("failed to read preferences {}: {source}", .path.display())]
    ReadPreferences {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse preferences {}: {source}", .path.display())]
    ParsePreferences {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no preferences file configured")]
    NoPreferencesFile,

    #[error(transparent)]
    Dashboard(#[from] dash_core::ConfigError),
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn poller thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("poller already stopped")]
    Stopped,
}
