//! Service instance commands - async operation tracking.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use pat_converge::Budget;
use pat_harness::resources::{await_gone, await_gone_or_failed, await_ready, ResourceProbe, ServiceInstance};
use pat_harness::ProcessRunner;

use crate::output::print_outcome;

use super::CommandContext;

fn instance(ctx: &CommandContext, name: &str) -> ServiceInstance {
    ServiceInstance::new(
        Arc::new(ProcessRunner::from_config(&ctx.config)),
        ctx.context.clone(),
        name,
        ctx.config.policy(Budget::Short).timeout(),
    )
}

/// Wait for a service instance's last operation to succeed.
#[derive(Debug, Args)]
pub struct AwaitServiceCommand {
    /// Service instance name.
    instance: String,
}

impl AwaitServiceCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let probe = instance(&ctx, &self.instance);
        let outcome = await_ready(&probe, ctx.config.policy(Budget::AsyncOperation)).await;
        Ok(print_outcome(
            &outcome,
            format!("{} ready", probe.describe()),
            ctx.format,
        ))
    }
}

/// Wait for a service instance to disappear.
#[derive(Debug, Args)]
pub struct AwaitAbsentCommand {
    /// Service instance name.
    instance: String,

    /// Stop early when the instance reports a failed delete.
    #[arg(long)]
    fail_on_delete_failure: bool,
}

impl AwaitAbsentCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let probe = instance(&ctx, &self.instance);
        let policy = ctx.config.policy(Budget::AsyncOperation);
        let outcome = if self.fail_on_delete_failure {
            await_gone_or_failed(&probe, policy).await
        } else {
            await_gone(&probe, policy).await
        };
        Ok(print_outcome(
            &outcome,
            format!("{} gone", probe.describe()),
            ctx.format,
        ))
    }
}
