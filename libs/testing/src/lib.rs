//! Fake capabilities for reconciler tests.
//!
//! Every fake records what it was asked to do so tests can assert on
//! connections, commits and restarts without a live engine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dbopt_reconcile::{
    ActiveNodeDetector, Capabilities, CommitError, ConfigOption, ConnectionError, Connector,
    HostNameResolver, InstanceConnection, Messages, Reconciler, RestartError, ServiceRestarter,
};

/// Shared state of a fake instance.
#[derive(Debug, Default)]
struct InstanceState {
    options: Vec<ConfigOption>,
    clustered: bool,
    physical_node: String,
    commits: usize,
    commit_failure: Option<String>,
}

/// An in-memory instance. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeInstance {
    state: Arc<Mutex<InstanceState>>,
}

impl FakeInstance {
    /// Create a standalone instance exposing the given options.
    pub fn new(options: Vec<ConfigOption>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InstanceState {
                options,
                physical_node: "LOCALHOST".to_string(),
                ..InstanceState::default()
            })),
        }
    }

    /// Mark the instance as clustered and currently hosted on `node`.
    pub fn clustered_on(self, node: &str) -> Self {
        {
            let mut state = self.lock();
            state.clustered = true;
            state.physical_node = node.to_string();
        }
        self
    }

    /// Make every commit fail with `reason`.
    pub fn failing_commits(self, reason: &str) -> Self {
        self.lock().commit_failure = Some(reason.to_string());
        self
    }

    /// Committed value of an option, if it exists.
    pub fn value_of(&self, display_name: &str) -> Option<i32> {
        self.lock()
            .options
            .iter()
            .find(|o| o.display_name() == display_name)
            .map(ConfigOption::configured_value)
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    fn lock(&self) -> MutexGuard<'_, InstanceState> {
        // A poisoned lock only happens after a test already panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Session handed out by [`FakeConnector`].
///
/// Works on a copy of the options until commit, like a real session.
pub struct FakeSession {
    instance: FakeInstance,
    options: Vec<ConfigOption>,
    clustered: bool,
    physical_node: String,
}

impl InstanceConnection for FakeSession {
    fn options(&self) -> &[ConfigOption] {
        &self.options
    }

    fn options_mut(&mut self) -> &mut [ConfigOption] {
        &mut self.options
    }

    fn commit(&mut self) -> Result<(), CommitError> {
        let mut state = self.instance.lock();
        if let Some(reason) = &state.commit_failure {
            let option = self
                .options
                .iter()
                .filter(|o| o.is_assigned())
                .map(ConfigOption::display_name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CommitError::new(option, reason.clone()));
        }
        state.options = self.options.clone();
        state.commits += 1;
        Ok(())
    }

    fn is_clustered(&self) -> bool {
        self.clustered
    }

    fn physical_node_name(&self) -> &str {
        &self.physical_node
    }
}

/// Connector over a fixed set of fake instances.
#[derive(Debug, Default)]
pub struct FakeConnector {
    instances: BTreeMap<(String, String), FakeInstance>,
    failure: Option<String>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance reachable at `server\instance`.
    pub fn with_instance(mut self, server: &str, instance: &str, fake: FakeInstance) -> Self {
        self.instances
            .insert((server.to_string(), instance.to_string()), fake);
        self
    }

    /// Make every connection attempt fail with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Number of connection attempts.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect(
        &self,
        server_name: &str,
        instance_name: &str,
    ) -> Result<Box<dyn InstanceConnection>, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.failure {
            return Err(ConnectionError::new(server_name, instance_name, reason.clone()));
        }

        let instance = self
            .instances
            .get(&(server_name.to_string(), instance_name.to_string()))
            .ok_or_else(|| ConnectionError::new(server_name, instance_name, "instance not found"))?
            .clone();

        let (options, clustered, physical_node) = {
            let state = instance.lock();
            (
                state.options.clone(),
                state.clustered,
                state.physical_node.clone(),
            )
        };

        Ok(Box::new(FakeSession {
            instance,
            options,
            clustered,
            physical_node,
        }))
    }
}

/// Active-node detector with a switchable answer.
#[derive(Debug)]
pub struct FakeActiveNode(AtomicBool);

impl FakeActiveNode {
    pub fn new(active: bool) -> Self {
        Self(AtomicBool::new(active))
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::SeqCst);
    }
}

impl ActiveNodeDetector for FakeActiveNode {
    fn is_active(&self, _connection: &dyn InstanceConnection) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A recorded restart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartCall {
    pub server: String,
    pub instance: String,
    pub timeout: Duration,
}

/// How [`FakeRestarter`] responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartBehavior {
    #[default]
    Succeed,
    Fail,
    TimeOut,
}

/// Service restarter that records every call.
#[derive(Debug, Default)]
pub struct FakeRestarter {
    behavior: RestartBehavior,
    calls: Mutex<Vec<RestartCall>>,
}

impl FakeRestarter {
    pub fn new(behavior: RestartBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RestartCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ServiceRestarter for FakeRestarter {
    fn restart(
        &self,
        server_name: &str,
        instance_name: &str,
        timeout: Duration,
    ) -> Result<(), RestartError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RestartCall {
                server: server_name.to_string(),
                instance: instance_name.to_string(),
                timeout,
            });

        match self.behavior {
            RestartBehavior::Succeed => Ok(()),
            RestartBehavior::Fail => Err(RestartError::Failed {
                server: server_name.to_string(),
                instance: instance_name.to_string(),
                reason: "service control manager refused the request".to_string(),
            }),
            RestartBehavior::TimeOut => Err(RestartError::Timeout {
                server: server_name.to_string(),
                instance: instance_name.to_string(),
                timeout,
            }),
        }
    }
}

/// Host-name resolver returning a fixed name.
#[derive(Debug, Clone)]
pub struct FixedHostName(pub String);

impl HostNameResolver for FixedHostName {
    fn local_computer_name(&self) -> String {
        self.0.clone()
    }
}

/// A reconciler wired to fakes, with handles for assertions.
pub struct Harness {
    pub reconciler: Reconciler,
    pub connector: Arc<FakeConnector>,
    pub active_node: Arc<FakeActiveNode>,
    pub restarter: Arc<FakeRestarter>,
}

impl Harness {
    /// Local host name used by every harness.
    pub const LOCAL_HOST: &'static str = "SQLNODE1";

    /// Build a harness around a connector.
    pub fn new(connector: FakeConnector, restart: RestartBehavior) -> Self {
        let connector = Arc::new(connector);
        let active_node = Arc::new(FakeActiveNode::new(true));
        let restarter = Arc::new(FakeRestarter::new(restart));

        let reconciler = Reconciler::new(
            Capabilities {
                connector: connector.clone(),
                active_node: active_node.clone(),
                restarter: restarter.clone(),
                host: Arc::new(FixedHostName(Self::LOCAL_HOST.to_string())),
            },
            Arc::new(Messages::en_us()),
        );

        Self {
            reconciler,
            connector,
            active_node,
            restarter,
        }
    }

    /// Harness with a single instance on the local host.
    pub fn single(instance: &str, fake: FakeInstance) -> Self {
        Self::new(
            FakeConnector::new().with_instance(Self::LOCAL_HOST, instance, fake),
            RestartBehavior::Succeed,
        )
    }
}
