//! Declarative reconciliation of one instance configuration option.
//!
//! A configuration-management agent drives three operations against a
//! database engine instance identified by host and instance name:
//!
//! - **Read**: report the option's current value and whether this host is
//!   the active node for the instance.
//! - **Test**: compare the current value against the desired value.
//! - **Apply**: assign and commit the desired value, then restart the
//!   instance, or warn that a restart is required, when the option is not
//!   dynamic.
//!
//! # Invariants
//!
//! - The option name resolves to exactly one exposed option, or the call fails
//! - Observed state is a fresh snapshot per call
//! - No capability failure is retried or swallowed
//!
//! Engine access, cluster ownership, service control and host-name
//! resolution are injected through the traits in [`capability`].

pub mod capability;
pub mod error;
pub mod messages;
pub mod reconciler;
pub mod types;

pub use capability::{
    ActiveNodeDetector, ConfigOption, Connector, HostNameResolver, InstanceConnection,
    PhysicalNodeDetector, ServiceRestarter,
};
pub use error::{CommitError, ConnectionError, ReconcileError, RestartError, Result};
pub use messages::{MessageKey, Messages, MessagesError};
pub use reconciler::{Capabilities, Reconciler};
pub use types::{
    ApplyOutcome, DesiredState, ObservedState, TestOutcome, DEFAULT_RESTART_TIMEOUT_SECS,
};
