//! Desired and observed state for a single configuration option.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};

/// Default maximum wait for a service restart, in seconds.
pub const DEFAULT_RESTART_TIMEOUT_SECS: u32 = 120;

fn default_restart_timeout_secs() -> u32 {
    DEFAULT_RESTART_TIMEOUT_SECS
}

/// The value a configuration option must hold on an instance.
///
/// Constructed by the caller per invocation; never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Target host. Defaults to the local computer name when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Target engine instance.
    pub instance_name: String,

    /// Display name of the configuration option.
    pub option_name: String,

    /// Value the option must hold.
    pub option_value: i32,

    /// Restart the instance when a non-dynamic option changes.
    #[serde(default)]
    pub restart_service: bool,

    /// Maximum wait for the restart to complete.
    #[serde(default = "default_restart_timeout_secs")]
    pub restart_timeout_secs: u32,

    /// Skip evaluation unless the local host owns the instance.
    #[serde(default)]
    pub process_only_on_active_node: bool,
}

impl DesiredState {
    /// Create a desired state with default restart and active-node settings.
    pub fn new(
        instance_name: impl Into<String>,
        option_name: impl Into<String>,
        option_value: i32,
    ) -> Self {
        Self {
            server_name: None,
            instance_name: instance_name.into(),
            option_name: option_name.into(),
            option_value,
            restart_service: false,
            restart_timeout_secs: DEFAULT_RESTART_TIMEOUT_SECS,
            process_only_on_active_node: false,
        }
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn with_restart_service(mut self, restart_service: bool) -> Self {
        self.restart_service = restart_service;
        self
    }

    pub fn with_restart_timeout_secs(mut self, secs: u32) -> Self {
        self.restart_timeout_secs = secs;
        self
    }

    pub fn with_process_only_on_active_node(mut self, only_active: bool) -> Self {
        self.process_only_on_active_node = only_active;
        self
    }

    /// Restart timeout as a duration.
    pub fn restart_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.restart_timeout_secs))
    }

    /// Server name if one was given and is non-empty.
    pub fn explicit_server_name(&self) -> Option<&str> {
        self.server_name.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Reject states that cannot identify an instance option.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("instance_name", &self.instance_name)?;
        require_non_empty("option_name", &self.option_name)
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReconcileError::InvalidArgument(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Snapshot of an option as read from a live instance.
///
/// Built fresh by every read; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedState {
    pub server_name: String,
    pub instance_name: String,

    /// Canonical display name as exposed by the instance.
    pub option_name: String,

    /// Currently configured value.
    pub option_value: i32,

    /// Echoed from the request; not read back from the instance.
    pub restart_service: bool,

    /// Echoed from the request; not read back from the instance.
    pub restart_timeout_secs: u32,

    /// Whether the local host currently owns the instance.
    pub is_active_node: bool,
}

/// Result of comparing observed state against desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// The option already holds the desired value.
    Satisfied,

    /// The option holds a different value.
    Unsatisfied,

    /// Evaluation was skipped because this node is not the active owner.
    NotApplicable,
}

impl TestOutcome {
    /// Returns true if the option already holds the desired value.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }

    /// Returns true if apply should run. Not-applicable means no action.
    pub fn needs_apply(&self) -> bool {
        matches!(self, Self::Unsatisfied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfied => "satisfied",
            Self::Unsatisfied => "unsatisfied",
            Self::NotApplicable => "not_applicable",
        }
    }
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which restart-decision branch an apply took after committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The option is dynamic; the new value is already in effect.
    NoRestartNeeded,

    /// The instance was restarted to pick up the new value.
    Restarted,

    /// The value is committed but a manual restart is still required.
    RestartRequired,
}

impl ApplyOutcome {
    /// Returns true if the new value is not yet in effect.
    pub fn restart_pending(&self) -> bool {
        matches!(self, Self::RestartRequired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRestartNeeded => "no_restart_needed",
            Self::Restarted => "restarted",
            Self::RestartRequired => "restart_required",
        }
    }
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
