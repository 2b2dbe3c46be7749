#![forbid(unsafe_code)]

pub const PLEASE_CONNECT_MESSAGE: &str = "Please connect to the selected server to view the graph.";
pub const RENDERING_ERROR_MESSAGE: &str = "An error occurred whilst rendering the graph.";
pub const NOT_CONNECTED_MESSAGE: &str =
    "Not connected to the server or the connection to the server has been closed.";

/// HTTP status the backend returns when the target connection is not open.
pub const PRECONDITION_REQUIRED: u16 = 428;

/// Why one poll's fetch failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchFailure {
    /// A response arrived with a non-2xx status.
    Status(u16),
    /// No response was received.
    Transport(String),
    Unclassified(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    PreconditionRequired,
    Rendering,
    Transport,
    Unclassified,
}

impl FetchFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Status(PRECONDITION_REQUIRED) => FailureKind::PreconditionRequired,
            Self::Status(_) => FailureKind::Rendering,
            Self::Transport(_) => FailureKind::Transport,
            Self::Unclassified(_) => FailureKind::Unclassified,
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "http status {status}"),
            Self::Transport(message) => write!(f, "transport: {message}"),
            Self::Unclassified(message) => write!(f, "unclassified: {message}"),
        }
    }
}

impl std::error::Error for FetchFailure {}

impl FailureKind {
    /// User-facing message, `None` for failures that are only logged.
    pub fn message(self) -> Option<&'static str> {
        match self {
            Self::PreconditionRequired => Some(PLEASE_CONNECT_MESSAGE),
            Self::Rendering => Some(RENDERING_ERROR_MESSAGE),
            Self::Transport => Some(NOT_CONNECTED_MESSAGE),
            Self::Unclassified => None,
        }
    }

    /// Whether this failure discards windows and baselines.
    pub fn resets_state(self) -> bool {
        matches!(self, Self::PreconditionRequired | Self::Rendering)
    }
}
