//! CLI settings.
//!
//! Resolution order, lowest to highest precedence:
//! - built-in defaults
//! - settings file (`--config`, or `settings.toml` in the platform config dir)
//! - command-line flags and `DBOPT_*` environment variables

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use dbopt_reconcile::{Messages, DEFAULT_RESTART_TIMEOUT_SECS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Settings file name.
const SETTINGS_FILE: &str = "settings.toml";

/// Default state file name.
const STATE_FILE: &str = "instances.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "dbopt", "dbopt")
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON document describing the instances the CLI manages.
    pub state_file: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Optional message table overriding the built-in en-US text.
    pub messages_file: Option<PathBuf>,

    /// Restart timeout used when a flag-built desired state omits one.
    pub restart_timeout_secs: u32,
}

fn default_state_file() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(STATE_FILE))
        .unwrap_or_else(|| PathBuf::from(STATE_FILE))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            messages_file: None,
            restart_timeout_secs: DEFAULT_RESTART_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, the default location, or defaults.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(CliError::ConfigNotFound(path.to_path_buf()).into())
            }
            Some(path) => path.to_path_buf(),
            None => match project_dirs() {
                Some(dirs) => dirs.config_dir().join(SETTINGS_FILE),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::invalid_file("settings", path, e))?;
        let settings: Self =
            toml::from_str(&contents).map_err(|e| CliError::invalid_file("settings", path, e))?;
        Ok(settings)
    }

    /// Build the message table, applying the configured override if any.
    pub fn messages(&self) -> Result<Messages> {
        let Some(path) = &self.messages_file else {
            return Ok(Messages::en_us());
        };
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::invalid_file("messages", path, e))?;
        let messages = Messages::from_toml_str(&contents)
            .map_err(|e| CliError::invalid_file("messages", path, e))?;
        Ok(messages)
    }
}
