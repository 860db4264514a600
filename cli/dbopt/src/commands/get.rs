//! Get command - read the current value of an option.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::output::print_observed;

use super::CommandContext;

/// Get command - read an option without changing anything.
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Target host (defaults to the local computer name).
    #[arg(long, short = 's', env = "DBOPT_SERVER")]
    server: Option<String>,

    /// Target instance name.
    #[arg(long, short = 'i')]
    instance: String,

    /// Option display name.
    #[arg(long, short = 'o')]
    option: String,
}

impl GetCommand {
    pub fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let observed = ctx
            .reconciler
            .read(self.server.as_deref(), &self.instance, &self.option)?;
        print_observed(&observed, ctx.format);
        Ok(ExitCode::SUCCESS)
    }
}
