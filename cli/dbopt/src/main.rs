//! dbopt - keep a database instance configuration option in its desired state.

use std::process::ExitCode;

use clap::Parser;
use dbopt_cli::{error, logging, Cli};
use tracing::debug;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error::print_error(&e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&settings.log_level, settings.log_format);
    debug!(
        state_file = %settings.state_file.display(),
        log_level = %settings.log_level,
        "Settings loaded"
    );

    match cli.run(settings) {
        Ok(code) => code,
        Err(e) => {
            error::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
