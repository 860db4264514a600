//! dbopt command line library
//!
//! Adapts the option reconciler to a command line an orchestrator can call:
//!
//! - **Commands**: `get`, `test`, `set` and the gated `reconcile` cycle
//! - **Backend**: JSON state file standing in for live instances
//! - **Settings**: TOML settings file with flag and environment overrides

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use backend::{StateFile, StateFileBackend, SystemHostName};
pub use commands::Cli;
pub use config::{LogFormat, Settings};
