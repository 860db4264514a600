//! Capabilities the reconciler depends on.
//!
//! Opening sessions, detecting cluster ownership, restarting services and
//! resolving the local host name all live outside this crate. They are
//! modelled as traits so that:
//! - production code plugs in a real engine connector
//! - tests substitute in-memory fakes
//!
//! All calls are blocking. Timeouts belong to the implementations.

use std::time::Duration;

use crate::error::{CommitError, ConnectionError, RestartError};

/// A configuration option exposed by an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    display_name: String,
    configured_value: i32,
    is_dynamic: bool,
    assigned: bool,
}

impl ConfigOption {
    pub fn new(display_name: impl Into<String>, configured_value: i32, is_dynamic: bool) -> Self {
        Self {
            display_name: display_name.into(),
            configured_value,
            is_dynamic,
            assigned: false,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn configured_value(&self) -> i32 {
        self.configured_value
    }

    /// Whether a change takes effect without restarting the instance.
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Stage a new configured value. Persisted by [`InstanceConnection::commit`].
    pub fn assign(&mut self, value: i32) {
        self.configured_value = value;
        self.assigned = true;
    }

    /// Whether a value was staged since the session was opened.
    pub fn is_assigned(&self) -> bool {
        self.assigned
    }
}

/// An open session against one instance.
pub trait InstanceConnection {
    /// Exposed configuration options, in instance order.
    fn options(&self) -> &[ConfigOption];

    fn options_mut(&mut self) -> &mut [ConfigOption];

    /// Persist every assigned value in a single alter against the instance.
    fn commit(&mut self) -> Result<(), CommitError>;

    /// Whether the instance is part of a failover cluster.
    fn is_clustered(&self) -> bool;

    /// Name of the physical node currently hosting the instance.
    fn physical_node_name(&self) -> &str;
}

/// Opens sessions to instances.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        server_name: &str,
        instance_name: &str,
    ) -> Result<Box<dyn InstanceConnection>, ConnectionError>;
}

/// Decides whether the local host owns an instance.
pub trait ActiveNodeDetector: Send + Sync {
    fn is_active(&self, connection: &dyn InstanceConnection) -> bool;
}

/// Stops and starts an instance service.
pub trait ServiceRestarter: Send + Sync {
    /// Restart and wait up to `timeout` for the service to come back.
    fn restart(
        &self,
        server_name: &str,
        instance_name: &str,
        timeout: Duration,
    ) -> Result<(), RestartError>;
}

/// Resolves the local computer name.
pub trait HostNameResolver: Send + Sync {
    fn local_computer_name(&self) -> String;
}

/// Active-node detection based on the physical node hosting the instance.
///
/// A standalone instance is always active. A clustered instance is active
/// only on the node whose name matches the local computer name.
pub struct PhysicalNodeDetector<H> {
    host: H,
}

impl<H: HostNameResolver> PhysicalNodeDetector<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

impl<H: HostNameResolver> ActiveNodeDetector for PhysicalNodeDetector<H> {
    fn is_active(&self, connection: &dyn InstanceConnection) -> bool {
        if !connection.is_clustered() {
            return true;
        }
        connection
            .physical_node_name()
            .eq_ignore_ascii_case(&self.host.local_computer_name())
    }
}
