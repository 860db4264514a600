//! Reconcile command - test, then apply only on drift.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use dbopt_reconcile::TestOutcome;
use tracing::info;

use crate::output::{print_apply, print_test};

use super::{CommandContext, DesiredArgs};

/// Reconcile command - the gated read/test/apply cycle.
///
/// A passive node is left alone: not-applicable means no action.
#[derive(Debug, Args)]
pub struct ReconcileCommand {
    #[command(flatten)]
    desired: DesiredArgs,
}

impl ReconcileCommand {
    pub fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let desired = self.desired.resolve(&ctx.settings)?;
        let (outcome, observed) = ctx.reconciler.evaluate(&desired)?;

        match outcome {
            TestOutcome::Satisfied | TestOutcome::NotApplicable => {
                info!(outcome = %outcome, "No remediation needed");
                print_test(outcome, &observed, ctx.format);
            }
            TestOutcome::Unsatisfied => {
                let applied = ctx.reconciler.apply(&desired)?;
                print_apply(applied, &observed.option_name, desired.option_value, ctx.format);
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
