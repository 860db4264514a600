//! Error types for option reconciliation.

use std::time::Duration;

use thiserror::Error;

/// Failure to open a session against an instance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to connect to instance '{instance}' on '{server}': {reason}")]
pub struct ConnectionError {
    pub server: String,
    pub instance: String,
    pub reason: String,
}

impl ConnectionError {
    pub fn new(
        server: impl Into<String>,
        instance: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            instance: instance.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to persist assigned option values back to the instance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to commit configuration option '{option}': {reason}")]
pub struct CommitError {
    pub option: String,
    pub reason: String,
}

impl CommitError {
    pub fn new(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while restarting an instance service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RestartError {
    /// The service could not be stopped or started.
    #[error("failed to restart instance '{instance}' on '{server}': {reason}")]
    Failed {
        server: String,
        instance: String,
        reason: String,
    },

    /// The service did not come back within the allotted time.
    #[error("instance '{instance}' on '{server}' did not restart within {timeout:?}")]
    Timeout {
        server: String,
        instance: String,
        timeout: Duration,
    },
}

/// Reconciliation errors.
///
/// Capability failures are carried unmodified; nothing here is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The connector could not open a session.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// No exposed option has the requested display name.
    #[error("configuration option '{option}' was not found on the instance")]
    OptionNotFound { option: String },

    /// The instance rejected the altered value.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The restart branch of apply failed.
    #[error(transparent)]
    Restart(#[from] RestartError),

    /// The desired state is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ReconcileError {
    /// Returns true if the requested option does not exist on the instance.
    pub fn is_option_not_found(&self) -> bool {
        matches!(self, Self::OptionNotFound { .. })
    }

    /// Returns true if this error came from the connector.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns true if the service restart timed out.
    pub fn is_restart_timeout(&self) -> bool {
        matches!(self, Self::Restart(RestartError::Timeout { .. }))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ReconcileError>;
