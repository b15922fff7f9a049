//! Scenario driver.
//!
//! A [`Scenario`] sequences collaborator actions and convergence waits for
//! one end-to-end test case. It owns the test context, the collaborators
//! and a cleanup stack. [`Scenario::run`] always unwinds the cleanup stack
//! in reverse registration order, whether the body succeeds, returns an
//! error or panics on a failed assertion. A panic is re-raised once
//! cleanup is done.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use pat_converge::{
    poll, Budget, BudgetTable, CommandOutput, PollOutcome, PollPolicy, Predicate, Sampler, Snapshot,
};
use tracing::{info, info_span, warn, Instrument};

use crate::api::ApiClient;
use crate::cli::{args, render, CommandRunner, ProcessRunner};
use crate::config::HarnessConfig;
use crate::context::TestContext;
use crate::error::HarnessError;
use crate::probe::HttpProbe;
use crate::resources::{self, App, AppRoute, Droplet, Package, ResourceProbe, ServiceInstance};
use crate::samplers::CliSampler;

/// A command to run when the scenario ends.
#[derive(Debug, Clone)]
struct Cleanup {
    context: TestContext,
    args: Vec<String>,
}

/// One end-to-end test case.
#[derive(Clone)]
pub struct Scenario {
    name: Arc<str>,
    config: Arc<HarnessConfig>,
    context: TestContext,
    runner: Arc<dyn CommandRunner>,
    api: ApiClient,
    probe: HttpProbe,
    cleanups: Arc<Mutex<Vec<Cleanup>>>,
}

impl Scenario {
    /// Build a scenario with explicit collaborators.
    pub fn new(
        name: impl Into<String>,
        config: HarnessConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, HarnessError> {
        let context = TestContext::from_config(&config);
        let api = ApiClient::new(&context, None, config.policy(Budget::Short).timeout())?;
        let probe = HttpProbe::from_config(&config, config.policy(Budget::Curl).timeout())?;

        Ok(Self {
            name: Arc::from(name.into()),
            config: Arc::new(config),
            context,
            runner,
            api,
            probe,
            cleanups: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Build a scenario from the environment, driving the real command client.
    pub fn from_env(name: impl Into<String>) -> Result<Self, HarnessError> {
        let config = HarnessConfig::load()?;
        let runner = Arc::new(ProcessRunner::from_config(&config));
        Self::new(name, config, runner)
    }

    /// Use an authenticated API client.
    pub fn with_api_token(mut self, token: &str) -> Result<Self, HarnessError> {
        self.api = ApiClient::new(
            &self.context,
            Some(token),
            self.policy(Budget::Short).timeout(),
        )?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn context(&self) -> &TestContext {
        &self.context
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn probe(&self) -> &HttpProbe {
        &self.probe
    }

    pub fn policy(&self, budget: Budget) -> PollPolicy {
        self.config.policy(budget)
    }

    // =========================================================================
    // Context switching
    // =========================================================================

    fn with_context(&self, context: TestContext) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    /// The same scenario acting as the admin user. Shares the cleanup stack.
    pub fn as_admin(&self) -> Self {
        self.with_context(self.context.as_admin())
    }

    /// The same scenario acting as the regular user.
    pub fn as_regular(&self) -> Self {
        self.with_context(self.context.as_regular())
    }

    pub fn with_org(&self, org: impl Into<String>) -> Self {
        self.with_context(self.context.with_org(org))
    }

    pub fn with_space(&self, space: impl Into<String>) -> Self {
        self.with_context(self.context.with_space(space))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Run `body`, then unwind the cleanup stack.
    pub async fn run<F, Fut>(self, body: F) -> Result<(), HarnessError>
    where
        F: FnOnce(Scenario) -> Fut,
        Fut: Future<Output = Result<(), HarnessError>>,
    {
        let span = info_span!("scenario", name = %self.name);
        async move {
            info!("Scenario started");
            let scenario = self.clone();
            let result = AssertUnwindSafe(async move { body(scenario).await })
                .catch_unwind()
                .await;
            let cleanup = self.run_cleanups().await;

            match result {
                Err(panic) => {
                    warn!("Scenario panicked");
                    std::panic::resume_unwind(panic)
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "Scenario failed");
                    Err(err)
                }
                Ok(Ok(())) => {
                    cleanup?;
                    info!("Scenario passed");
                    Ok(())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Register a command to run, as the current user, when the scenario ends.
    pub fn defer<I, S>(&self, command: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Cleanup {
                context: self.context.clone(),
                args: args(command),
            });
    }

    fn pop_cleanup(&self) -> Option<Cleanup> {
        self.cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    async fn run_cleanups(&self) -> Result<(), HarnessError> {
        let timeout = self.policy(Budget::Push).timeout();
        let mut first_error = None;

        while let Some(cleanup) = self.pop_cleanup() {
            let command = render(&self.config.cli_bin, &cleanup.args);
            let result = self
                .runner
                .run(&cleanup.context, &cleanup.args, timeout)
                .await
                .and_then(|output| require_success(&command, output));

            if let Err(err) = result {
                warn!(command = %command, error = %err, "Cleanup failed");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Run a command within the short budget.
    pub async fn cli<I, S>(&self, command: I) -> Result<CommandOutput, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cli_within(Budget::Short, command).await
    }

    /// Run a command within a named budget's timeout.
    pub async fn cli_within<I, S>(
        &self,
        budget: Budget,
        command: I,
    ) -> Result<CommandOutput, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args(command);
        self.runner
            .run(&self.context, &args, self.policy(budget).timeout())
            .await
    }

    /// Run a command and require exit code 0.
    pub async fn run_ok<I, S>(&self, command: I) -> Result<CommandOutput, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_ok_within(Budget::Short, command).await
    }

    /// Run a command within a named budget and require exit code 0.
    pub async fn run_ok_within<I, S>(
        &self,
        budget: Budget,
        command: I,
    ) -> Result<CommandOutput, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args(command);
        let output = self
            .runner
            .run(&self.context, &args, self.policy(budget).timeout())
            .await?;
        require_success(&render(&self.config.cli_bin, &args), output)
    }

    /// Verify that an app's audit events include every name, in one shot.
    pub async fn check_events(&self, app: &str, names: &[&str]) -> Result<(), HarnessError> {
        let output = self.run_ok(["events", app]).await?;
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !output.stdout.contains(name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::step(
                format!("events {app}"),
                format!("missing events: {}", missing.join(", ")),
            ))
        }
    }

    // =========================================================================
    // Samplers and probes
    // =========================================================================

    /// Sampler that runs `command` as the current user.
    pub fn sampler<I, S>(&self, command: I) -> CliSampler
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CliSampler::new(
            self.runner.clone(),
            self.context.clone(),
            args(command),
            self.policy(Budget::Short).timeout(),
        )
    }

    pub fn service_instance(&self, name: impl Into<String>) -> ServiceInstance {
        ServiceInstance::new(
            self.runner.clone(),
            self.context.clone(),
            name,
            self.policy(Budget::Short).timeout(),
        )
    }

    pub fn app(&self, name: impl Into<String>) -> App {
        App::new(
            self.runner.clone(),
            self.context.clone(),
            name,
            self.policy(Budget::Short).timeout(),
        )
    }

    pub fn package(&self, guid: impl Into<String>) -> Package {
        Package::new(self.api.clone(), guid)
    }

    pub fn droplet(&self, guid: impl Into<String>) -> Droplet {
        Droplet::new(self.api.clone(), guid)
    }

    pub fn route(&self, host: impl Into<String>, path: impl Into<String>) -> AppRoute {
        AppRoute::new(self.probe.clone(), host, path)
    }

    // =========================================================================
    // Convergence
    // =========================================================================

    /// Turn a poll outcome into a step result per the configured failure
    /// handling.
    pub fn expect(
        &self,
        outcome: PollOutcome,
        expectation: impl Into<String>,
    ) -> Result<Snapshot, HarnessError> {
        Ok(outcome.into_result(expectation, self.config.failure_handling)?)
    }

    /// Poll `sampler` until `predicate` holds within `budget`.
    pub async fn wait_for<S, P>(
        &self,
        sampler: &S,
        predicate: &P,
        budget: Budget,
    ) -> Result<Snapshot, HarnessError>
    where
        S: Sampler + ?Sized,
        P: Predicate + ?Sized,
    {
        let policy = self.policy(budget);
        self.retrying(predicate.describe(), || poll(sampler, predicate, policy))
            .await
    }

    /// Wait for a resource's current operation to succeed.
    pub async fn await_ready<R: ResourceProbe>(
        &self,
        probe: &R,
        budget: Budget,
    ) -> Result<Snapshot, HarnessError> {
        let policy = self.policy(budget);
        self.retrying(format!("{} ready", probe.describe()), || {
            resources::await_ready(probe, policy)
        })
        .await
    }

    /// Wait for a resource to disappear.
    pub async fn await_gone<R: ResourceProbe>(
        &self,
        probe: &R,
        budget: Budget,
    ) -> Result<Snapshot, HarnessError> {
        let policy = self.policy(budget);
        self.retrying(format!("{} gone", probe.describe()), || {
            resources::await_gone(probe, policy)
        })
        .await
    }

    /// Re-run a timed-out poll up to `scenario_retries` times. Terminal
    /// failures are reported immediately.
    async fn retrying<F, Fut>(
        &self,
        expectation: String,
        mut attempt: F,
    ) -> Result<Snapshot, HarnessError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome>,
    {
        let mut retries = 0;
        loop {
            let outcome = attempt().await;
            if outcome.is_timed_out() && retries < self.config.scenario_retries {
                retries += 1;
                warn!(
                    expectation = %expectation,
                    retry = retries,
                    of = self.config.scenario_retries,
                    "Wait timed out, retrying"
                );
                continue;
            }
            return self.expect(outcome, expectation);
        }
    }
}

fn require_success(command: &str, output: CommandOutput) -> Result<CommandOutput, HarnessError> {
    if output.success() {
        Ok(output)
    } else {
        let detail = if output.stderr.trim().is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        Err(HarnessError::CommandFailed {
            command: command.to_string(),
            exit_code: output.exit_code,
            output: detail.trim().to_string(),
        })
    }
}

/// Budgets with millisecond intervals, for scenarios driven by fakes.
pub fn fast_budgets(interval: Duration, timeout: Duration) -> Result<BudgetTable, HarnessError> {
    Ok(BudgetTable::uniform(PollPolicy::new(interval, timeout)?))
}
