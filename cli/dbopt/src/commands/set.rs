//! Set command - apply the desired value unconditionally.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::output::print_apply;

use super::{CommandContext, DesiredArgs};

/// Set command - assign, commit and run the restart decision.
///
/// Active-node gating is ignored; use `reconcile` to honour it.
#[derive(Debug, Args)]
pub struct SetCommand {
    #[command(flatten)]
    pub(super) desired: DesiredArgs,
}

impl SetCommand {
    pub fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let desired = self.desired.resolve(&ctx.settings)?;
        let outcome = ctx.reconciler.apply(&desired)?;
        print_apply(outcome, &desired.option_name, desired.option_value, ctx.format);
        Ok(ExitCode::SUCCESS)
    }
}
