//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use dbopt_reconcile::{ReconcileError, RestartError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing required argument: --{0} (or pass --desired <FILE>)")]
    MissingArgument(&'static str),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid {kind} file {path}: {message}")]
    InvalidFile {
        kind: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl CliError {
    pub fn invalid_file(kind: &'static str, path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::InvalidFile {
            kind,
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let reconcile_err = err.downcast_ref::<ReconcileError>().or_else(|| {
        match err.downcast_ref::<CliError>() {
            Some(CliError::Reconcile(inner)) => Some(inner),
            _ => None,
        }
    });

    if let Some(hint) = reconcile_err.and_then(hint_for) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint_for(err: &ReconcileError) -> Option<&'static str> {
    match err {
        ReconcileError::Connection(_) => {
            Some("Check the server and instance names, and that the instance is running.")
        }
        ReconcileError::OptionNotFound { .. } => {
            Some("Option names must match the instance's display name exactly, including case.")
        }
        ReconcileError::Restart(RestartError::Timeout { .. }) => Some(
            "The value was committed. Raise --restart-timeout or restart the instance manually.",
        ),
        ReconcileError::Restart(RestartError::Failed { .. }) => {
            Some("The value was committed but the restart failed; restart the instance manually.")
        }
        _ => None,
    }
}
