//! File-backed instance backend.
//!
//! A JSON state file stands in for live engine instances:
//!
//! ```json
//! {
//!   "hosts": {
//!     "SQL01": {
//!       "instances": {
//!         "MSSQLSERVER": {
//!           "running": true,
//!           "clustered": false,
//!           "startup_secs": 5,
//!           "options": [
//!             { "display_name": "max server memory (MB)", "configured_value": 2048, "is_dynamic": false }
//!           ]
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Host and instance names are matched case-insensitively. Commits and
//! restarts rewrite the file through a temp file and rename.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dbopt_reconcile::{
    CommitError, ConfigOption, ConnectionError, Connector, HostNameResolver, InstanceConnection,
    RestartError, ServiceRestarter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Root of the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostRecord {
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceRecord>,
}

fn default_running() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    #[serde(default = "default_running")]
    pub running: bool,

    #[serde(default)]
    pub clustered: bool,

    /// Node currently hosting the instance. Defaults to the host key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_node: Option<String>,

    /// Simulated time the service takes to come back after a restart.
    #[serde(default)]
    pub startup_secs: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restarts: Vec<DateTime<Utc>>,

    #[serde(default)]
    pub options: Vec<OptionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub display_name: String,
    pub configured_value: i32,
    #[serde(default)]
    pub is_dynamic: bool,
}

impl From<&OptionRecord> for ConfigOption {
    fn from(record: &OptionRecord) -> Self {
        ConfigOption::new(
            record.display_name.clone(),
            record.configured_value,
            record.is_dynamic,
        )
    }
}

impl StateFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("cannot read state file {}: {e}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| format!("cannot parse state file {}: {e}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| format!("cannot serialize state: {e}"))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .map_err(|e| format!("cannot write {}: {e}", tmp.display()))?;
        fs::rename(&tmp, path).map_err(|e| format!("cannot replace {}: {e}", path.display()))
    }

    /// Find an instance and the canonical host key it lives under.
    fn instance_mut(&mut self, server: &str, instance: &str) -> Option<(&str, &mut InstanceRecord)> {
        self.hosts
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(server))
            .and_then(|(host, record)| {
                record
                    .instances
                    .iter_mut()
                    .find(|(name, _)| name.eq_ignore_ascii_case(instance))
                    .map(|(_, inst)| (host.as_str(), inst))
            })
    }
}

/// Connector and service restarter backed by a state file.
#[derive(Debug, Clone)]
pub struct StateFileBackend {
    path: PathBuf,
}

impl StateFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for StateFileBackend {
    fn connect(
        &self,
        server_name: &str,
        instance_name: &str,
    ) -> Result<Box<dyn InstanceConnection>, ConnectionError> {
        let fail = |reason: String| ConnectionError::new(server_name, instance_name, reason);

        let mut state = StateFile::load(&self.path).map_err(fail)?;
        let (host, record) = state
            .instance_mut(server_name, instance_name)
            .ok_or_else(|| fail("no such instance".to_string()))?;

        if !record.running {
            return Err(fail("instance is not running".to_string()));
        }

        debug!(
            path = %self.path.display(),
            server = %server_name,
            instance = %instance_name,
            options = record.options.len(),
            "Opened state file session"
        );

        Ok(Box::new(StateFileSession {
            path: self.path.clone(),
            server: server_name.to_string(),
            instance: instance_name.to_string(),
            clustered: record.clustered,
            physical_node: record
                .physical_node
                .clone()
                .unwrap_or_else(|| host.to_string()),
            options: record.options.iter().map(ConfigOption::from).collect(),
        }))
    }
}

impl ServiceRestarter for StateFileBackend {
    fn restart(
        &self,
        server_name: &str,
        instance_name: &str,
        timeout: Duration,
    ) -> Result<(), RestartError> {
        let fail = |reason: String| RestartError::Failed {
            server: server_name.to_string(),
            instance: instance_name.to_string(),
            reason,
        };

        let mut state = StateFile::load(&self.path).map_err(fail)?;
        let (_, record) = state
            .instance_mut(server_name, instance_name)
            .ok_or_else(|| fail("no such instance".to_string()))?;

        if Duration::from_secs(record.startup_secs) > timeout {
            // Stopped but not yet back within the allotted time.
            record.running = false;
            state.save(&self.path).map_err(fail)?;
            return Err(RestartError::Timeout {
                server: server_name.to_string(),
                instance: instance_name.to_string(),
                timeout,
            });
        }

        record.running = true;
        record.restarts.push(Utc::now());
        state.save(&self.path).map_err(fail)
    }
}

struct StateFileSession {
    path: PathBuf,
    server: String,
    instance: String,
    clustered: bool,
    physical_node: String,
    options: Vec<ConfigOption>,
}

impl InstanceConnection for StateFileSession {
    fn options(&self) -> &[ConfigOption] {
        &self.options
    }

    fn options_mut(&mut self) -> &mut [ConfigOption] {
        &mut self.options
    }

    fn commit(&mut self) -> Result<(), CommitError> {
        let assigned: Vec<(usize, &ConfigOption)> = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_assigned())
            .collect();
        if assigned.is_empty() {
            return Ok(());
        }

        let names = assigned
            .iter()
            .map(|(_, o)| o.display_name())
            .collect::<Vec<_>>()
            .join(", ");
        let fail = |reason: String| CommitError::new(names.clone(), reason);

        let mut state = StateFile::load(&self.path).map_err(fail)?;
        let (_, record) = state
            .instance_mut(&self.server, &self.instance)
            .ok_or_else(|| fail("instance disappeared".to_string()))?;

        // The file may have been edited since connect, so match by name
        // rather than position. The nth duplicate maps to the nth stored one.
        for (index, staged) in &assigned {
            let name = staged.display_name();
            let occurrence = self.options[..*index]
                .iter()
                .filter(|o| o.display_name() == name)
                .count();
            let stored = record
                .options
                .iter_mut()
                .filter(|o| o.display_name == name)
                .nth(occurrence)
                .ok_or_else(|| {
                    CommitError::new(name, "option no longer exists on the instance")
                })?;
            stored.configured_value = staged.configured_value();
        }

        state.save(&self.path).map_err(fail)?;
        debug!(
            path = %self.path.display(),
            instance = %self.instance,
            options = %names,
            "Committed staged options"
        );
        Ok(())
    }

    fn is_clustered(&self) -> bool {
        self.clustered
    }

    fn physical_node_name(&self) -> &str {
        &self.physical_node
    }
}

/// Host-name resolution via `gethostname(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostName;

impl HostNameResolver for SystemHostName {
    fn local_computer_name(&self) -> String {
        nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }
}
