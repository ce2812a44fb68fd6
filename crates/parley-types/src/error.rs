use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from repository operations (used by the store trait in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("query error: {0}")]
    Query(String),
}

/// Failure of a model gateway call.
///
/// Never escapes the orchestrator: every variant is turned into a persisted
/// fallback reply carrying its [`code`](ModelError::code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("upstream body is not valid JSON")]
    MalformedUpstreamBody,

    #[error("upstream JSON is missing the expected fields")]
    UnexpectedUpstreamShape,
}

/// Stable, serializable discriminant of [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelErrorKind {
    MissingCredential,
    NetworkFailure,
    UpstreamStatus,
    MalformedUpstreamBody,
    UnexpectedUpstreamShape,
}

impl fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelErrorKind::MissingCredential => write!(f, "missing_credential"),
            ModelErrorKind::NetworkFailure => write!(f, "network_failure"),
            ModelErrorKind::UpstreamStatus => write!(f, "upstream_status"),
            ModelErrorKind::MalformedUpstreamBody => write!(f, "malformed_upstream_body"),
            ModelErrorKind::UnexpectedUpstreamShape => write!(f, "unexpected_upstream_shape"),
        }
    }
}

impl ModelError {
    pub fn kind(&self) -> ModelErrorKind {
        match self {
            ModelError::MissingCredential => ModelErrorKind::MissingCredential,
            ModelError::NetworkFailure(_) => ModelErrorKind::NetworkFailure,
            ModelError::UpstreamStatus(_) => ModelErrorKind::UpstreamStatus,
            ModelError::MalformedUpstreamBody => ModelErrorKind::MalformedUpstreamBody,
            ModelError::UnexpectedUpstreamShape => ModelErrorKind::UnexpectedUpstreamShape,
        }
    }

    /// Short machine-readable code, e.g. `upstream_status_503`.
    pub fn code(&self) -> String {
        match self {
            ModelError::UpstreamStatus(status) => format!("upstream_status_{status}"),
            other => other.kind().to_string(),
        }
    }
}

/// Errors surfaced by the conversation orchestrator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("conversation store failure: {0}")]
    Store(#[from] RepositoryError),
}

/// Errors from reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}
