//! Shared setup for the acceptance suites.
//!
//! Every suite drives the scenario layer against an in-process fake
//! platform: a scripted command runner and, where HTTP is involved, a
//! wiremock server standing in for the API or the router.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pat_converge::CommandOutput;
use pat_harness::fake::ScriptedRunner;
use pat_harness::{fast_budgets, HarnessConfig, Scenario};

/// Configuration with millisecond budgets.
pub fn config() -> HarnessConfig {
    pat_harness::telemetry::init_for_tests();
    HarnessConfig::default().with_budgets(
        fast_budgets(Duration::from_millis(5), Duration::from_millis(250))
            .expect("valid budgets"),
    )
}

pub fn scenario(name: &str, runner: &Arc<ScriptedRunner>, config: HarnessConfig) -> Scenario {
    Scenario::new(name, config, runner.clone()).expect("scenario")
}

/// Output of a command that failed with the client's usual banner.
pub fn failed(stdout: &str) -> CommandOutput {
    CommandOutput::new(1, format!("FAILED\n{stdout}"), "")
}
