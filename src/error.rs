//! Error types shared by every harness layer.
//!
//! Only [`HarnessError::Configuration`] is fatal to a whole run, and it is
//! raised before any case executes. Every other variant is contained to the
//! case that produced it and shows up in the run report as an errored case.

use std::fmt::{self, Display};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Invalid fixture constraints, malformed templates, bad config values or
    /// an inconsistent suite definition.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A template referenced a shared-state key nobody has written yet.
    #[error("missing shared state `{key}`")]
    MissingState { key: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {} ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The named schema could not be located or is not a valid schema
    /// document. A response that merely does not match is a failed
    /// assertion, not this error.
    #[error("failed to load schema `{name}`: {reason}")]
    SchemaLoad { name: String, reason: String },

    /// A state write could not find its value in the response.
    #[error("cannot extract `{key}` from response path `{path}`")]
    Extraction { key: String, path: String },

    /// Reading or writing a file such as the run report.
    #[error("I/O error on `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Configuration(_) | HarnessError::Json(_) => ErrorKind::Configuration,
            HarnessError::MissingState { .. } => ErrorKind::MissingState,
            HarnessError::Network(_) => ErrorKind::Network,
            HarnessError::Io { .. } => ErrorKind::Io,
            HarnessError::Timeout { .. } => ErrorKind::Timeout,
            HarnessError::SchemaLoad { .. } => ErrorKind::SchemaLoad,
            HarnessError::Extraction { .. } => ErrorKind::Extraction,
        }
    }

    /// Transport-level failures, the only errors a retry policy may repeat.
    pub fn is_transport(&self) -> bool {
        self.kind().is_transport()
    }
}

/// Report-friendly classification of [`HarnessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    MissingState,
    Network,
    Timeout,
    SchemaLoad,
    Extraction,
    Io,
}

impl ErrorKind {
    pub fn is_transport(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::MissingState => "missing state",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::SchemaLoad => "schema load",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Io => "io",
        };
        write!(f, "{label}")
    }
}
