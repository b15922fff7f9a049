//! Wait command - poll an arbitrary command.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use pat_converge::predicate::{all, contains, excludes, exit_code, fails_on, All};
use pat_converge::{poll, Budget, PollPolicy, Predicate, PredicateExt};
use pat_harness::samplers::CliSampler;
use pat_harness::ProcessRunner;

use crate::output::print_outcome;

use super::CommandContext;

/// Poll a command until its output satisfies every condition.
#[derive(Debug, Args)]
pub struct WaitCommand {
    /// Output must contain this text (repeatable).
    #[arg(long)]
    contains: Vec<String>,

    /// Output must not contain this text (repeatable).
    #[arg(long)]
    excludes: Vec<String>,

    /// Stop immediately if output contains this text (repeatable).
    #[arg(long)]
    fail_on: Vec<String>,

    /// Named time budget (short, push, async, curl).
    #[arg(long, default_value = "short")]
    budget: Budget,

    /// Override the budget's interval, in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Override the budget's timeout, in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Command to poll.
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

impl WaitCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let policy = self.policy(&ctx)?;
        let predicate = self.predicate();
        let expectation = predicate.describe();

        let Some((program, args)) = self.command.split_first() else {
            bail!("no command given");
        };
        let sampler = CliSampler::new(
            Arc::new(ProcessRunner::new(program.clone())),
            ctx.context.clone(),
            args.to_vec(),
            policy.timeout(),
        );

        let outcome = poll(&sampler, &predicate, policy).await;
        Ok(print_outcome(&outcome, expectation, ctx.format))
    }

    fn policy(&self, ctx: &CommandContext) -> Result<PollPolicy> {
        let base = ctx.config.policy(self.budget);
        let interval = self
            .interval
            .map(std::time::Duration::from_secs)
            .unwrap_or(base.interval());
        let timeout = self
            .timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or(base.timeout());
        Ok(PollPolicy::new(interval, timeout)?)
    }

    /// Failure checks first, then the positive conditions. With no positive
    /// condition the command must exit 0.
    fn predicate(&self) -> All {
        let mut predicates: Vec<Box<dyn Predicate>> = self
            .fail_on
            .iter()
            .map(|needle| fails_on(needle.clone(), format!("output contains '{needle}'")).boxed())
            .collect();
        predicates.extend(self.contains.iter().map(|needle| contains(needle.clone()).boxed()));
        predicates.extend(self.excludes.iter().map(|needle| excludes(needle.clone()).boxed()));
        if self.contains.is_empty() && self.excludes.is_empty() {
            predicates.push(exit_code(0).boxed());
        }
        all(predicates)
    }
}
