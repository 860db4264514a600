//! CLI commands.

mod get;
mod reconcile;
mod set;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dbopt_reconcile::{Capabilities, DesiredState, PhysicalNodeDetector, Reconciler};

use crate::backend::{StateFileBackend, SystemHostName};
use crate::config::{LogFormat, Settings};
use crate::error::CliError;
use crate::output::OutputFormat;

/// dbopt - keep a database instance configuration option in its desired state.
#[derive(Debug, Parser)]
#[command(name = "dbopt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to settings.toml in the user config dir).
    #[arg(long, global = true, env = "DBOPT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Instance state file.
    #[arg(long, global = true, env = "DBOPT_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "DBOPT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format.
    #[arg(long, global = true, value_enum, env = "DBOPT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read the current value of an option.
    Get(get::GetCommand),

    /// Check whether an option holds its desired value.
    Test(test::TestCommand),

    /// Set an option to its desired value unconditionally.
    Set(set::SetCommand),

    /// Test, then set only when the option has drifted.
    Reconcile(reconcile::ReconcileCommand),
}

/// Shared context for all commands.
pub struct CommandContext {
    pub reconciler: Reconciler,
    pub settings: Settings,
    pub format: OutputFormat,
}

impl Cli {
    /// Merge the settings file with flag and environment overrides.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(state_file) = &self.state_file {
            settings.state_file = state_file.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            settings.log_format = format;
        }
        Ok(settings)
    }

    /// Run the CLI command.
    pub fn run(self, settings: Settings) -> Result<ExitCode> {
        let backend = Arc::new(StateFileBackend::new(settings.state_file.clone()));
        let messages = Arc::new(settings.messages()?);
        let reconciler = Reconciler::new(
            Capabilities {
                connector: backend.clone(),
                active_node: Arc::new(PhysicalNodeDetector::new(SystemHostName)),
                restarter: backend,
                host: Arc::new(SystemHostName),
            },
            messages,
        );

        let ctx = CommandContext {
            reconciler,
            settings,
            format: self.format,
        };

        match self.command {
            Commands::Get(cmd) => cmd.run(ctx),
            Commands::Test(cmd) => cmd.run(ctx),
            Commands::Set(cmd) => cmd.run(ctx),
            Commands::Reconcile(cmd) => cmd.run(ctx),
        }
    }
}

/// Desired state given as flags or as a TOML document.
#[derive(Debug, Args)]
pub struct DesiredArgs {
    /// Load the desired state from a TOML file. Flags below override it.
    #[arg(long, value_name = "FILE")]
    desired: Option<PathBuf>,

    /// Target host (defaults to the local computer name).
    #[arg(long, short = 's', env = "DBOPT_SERVER")]
    server: Option<String>,

    /// Target instance name.
    #[arg(long, short = 'i')]
    instance: Option<String>,

    /// Option display name.
    #[arg(long, short = 'o')]
    option: Option<String>,

    /// Desired value.
    #[arg(long, allow_negative_numbers = true)]
    value: Option<i32>,

    /// Restart the instance if the option is not dynamic.
    /// `--restart-service=false` turns it off for a desired file.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    restart_service: Option<bool>,

    /// Seconds to wait for a restart to complete.
    #[arg(long, value_name = "SECS")]
    restart_timeout: Option<u32>,

    /// Only evaluate on the node that owns the instance.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    only_active_node: Option<bool>,
}

impl DesiredArgs {
    /// Build and validate the desired state.
    pub fn resolve(&self, settings: &Settings) -> Result<DesiredState> {
        let mut desired = match &self.desired {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| CliError::invalid_file("desired state", path, e))?;
                toml::from_str::<DesiredState>(&contents)
                    .map_err(|e| CliError::invalid_file("desired state", path, e))?
            }
            None => DesiredState::new(
                self.instance
                    .clone()
                    .ok_or(CliError::MissingArgument("instance"))?,
                self.option
                    .clone()
                    .ok_or(CliError::MissingArgument("option"))?,
                self.value.ok_or(CliError::MissingArgument("value"))?,
            )
            .with_restart_timeout_secs(settings.restart_timeout_secs),
        };

        if let Some(server) = &self.server {
            desired.server_name = Some(server.clone());
        }
        if let Some(instance) = &self.instance {
            desired.instance_name = instance.clone();
        }
        if let Some(option) = &self.option {
            desired.option_name = option.clone();
        }
        if let Some(value) = self.value {
            desired.option_value = value;
        }
        if let Some(secs) = self.restart_timeout {
            desired.restart_timeout_secs = secs;
        }
        if let Some(restart) = self.restart_service {
            desired.restart_service = restart;
        }
        if let Some(gated) = self.only_active_node {
            desired.process_only_on_active_node = gated;
        }

        desired.validate().map_err(CliError::from)?;
        Ok(desired)
    }
}
