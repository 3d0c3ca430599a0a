//! Error taxonomy for platform operations
//!
//! Transient transport failures are swallowed inside the monitor; every
//! other error reaches the caller as one of the types below. Driver errors
//! always carry the console detail link once an operation id exists.

use std::time::Duration;

use thiserror::Error;

use crate::monitor::ResourceKind;

/// Invalid configuration or step arguments. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing Alauda configuration: '{field}' must be set")]
    Missing { field: &'static str },

    #[error("Invalid console url '{url}': {reason}")]
    InvalidConsoleUrl { url: String, reason: String },

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("Operation id must not be empty")]
    EmptyOperationId,

    #[error("Argument '{field}' must not be empty")]
    MissingArgument { field: &'static str },

    #[error("Option '{option}' is not supported for {kind} operations")]
    Unsupported {
        option: &'static str,
        kind: ResourceKind,
    },

    #[error("Invalid step arguments: {message}")]
    InvalidStep { message: String },
}

/// Failure of a single call to the platform API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection refused, reset, request timeout and similar.
    #[error("Network error: {0}")]
    Transport(String),

    /// The platform answered with a non-success status code.
    #[error("Unexpected code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A response arrived but could not be decoded or lacked required fields.
    #[error("Unexpected response data: {0}")]
    Malformed(String),

    /// A lookup came back empty.
    #[error("{0} is not found.")]
    NotFound(String),
}

impl ClientError {
    /// Whether the failure is attributable to availability rather than to
    /// a protocol mismatch.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ClientError::Malformed(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ClientError::Malformed(error.to_string())
        } else if let Some(status) = error.status() {
            ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body: error.to_string(),
            }
        } else {
            ClientError::Transport(error.to_string())
        }
    }
}

/// Failure of one status query, split by retry policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// Retried on the next poll tick; never counted against a budget.
    #[error("{0}")]
    Transient(String),

    /// Not retried; ends the monitor run with `Outcome::Errored`.
    #[error("Malformed status response: {0}")]
    Malformed(String),
}

impl From<ClientError> for StatusError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Malformed(message) => StatusError::Malformed(message),
            other => StatusError::Transient(other.to_string()),
        }
    }
}

/// Cause carried by `Outcome::Errored`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("malformed status response: {0}")]
    Malformed(String),

    #[error("interrupted while waiting for the operation")]
    Interrupted,

    #[error("rollback request was not accepted: {0}")]
    RollbackRejected(String),
}

/// What happened about rollback when an update failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackReport {
    /// The caller did not ask for rollback.
    NotRequested,
    /// Rollback was asked for but the operation has nothing to roll back to.
    Unavailable,
    /// Rollback was submitted and its own monitor run succeeded.
    RolledBack { link: String },
}

impl std::fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackReport::NotRequested => write!(f, "rollback not requested"),
            RollbackReport::Unavailable => write!(f, "rollback not available"),
            RollbackReport::RolledBack { link } => {
                write!(f, "already rolled back, rollback detail -> {}", link)
            }
        }
    }
}

/// Final error of one driver invocation.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{label} submit failed: {source}")]
    Submit { label: String, source: ClientError },

    #[error("{label} {id} FAILED ({rollback}). Show the details -> {link}")]
    Failed {
        label: String,
        id: String,
        link: String,
        rollback: RollbackReport,
    },

    #[error("{label} {id} FAILED and rollback did not complete ({cause}). Show the details -> {link}, rollback detail -> {rollback_link}")]
    RollbackFailed {
        label: String,
        id: String,
        link: String,
        rollback_link: String,
        cause: String,
    },

    #[error("{label} {id} TIMEOUT after {}s (last status: {}). Show the details -> {link}", .elapsed.as_secs(), .last_status.as_deref().unwrap_or("unknown"))]
    TimedOut {
        label: String,
        id: String,
        link: String,
        elapsed: Duration,
        last_status: Option<String>,
    },

    #[error("{label} {id} ERROR: {cause}. Show the details -> {link}")]
    Errored {
        label: String,
        id: String,
        link: String,
        cause: MonitorError,
    },
}

impl DriverError {
    /// Console link for the operation, when one was created.
    pub fn detail_link(&self) -> Option<&str> {
        match self {
            DriverError::Config(_) | DriverError::Submit { .. } => None,
            DriverError::Failed { link, .. }
            | DriverError::RollbackFailed { link, .. }
            | DriverError::TimedOut { link, .. }
            | DriverError::Errored { link, .. } => Some(link),
        }
    }

    /// Operation id, when the mutating call got far enough to return one.
    pub fn operation_id(&self) -> Option<&str> {
        match self {
            DriverError::Config(_) | DriverError::Submit { .. } => None,
            DriverError::Failed { id, .. }
            | DriverError::RollbackFailed { id, .. }
            | DriverError::TimedOut { id, .. }
            | DriverError::Errored { id, .. } => Some(id),
        }
    }
}

/// Error of a whole pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
