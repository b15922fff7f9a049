//! Budgets command - show the resolved time budgets.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use pat_converge::Budget;
use serde::Serialize;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

/// Show the named time budgets after scaling.
#[derive(Debug, Args)]
pub struct BudgetsCommand {}

#[derive(Debug, Serialize, Tabled)]
struct BudgetRow {
    #[tabled(rename = "Budget")]
    name: &'static str,
    #[tabled(rename = "Interval (s)")]
    interval_secs: f64,
    #[tabled(rename = "Timeout (s)")]
    timeout_secs: f64,
}

impl BudgetsCommand {
    pub fn run(self, ctx: CommandContext) -> Result<ExitCode> {
        let rows: Vec<BudgetRow> = [
            Budget::Short,
            Budget::Push,
            Budget::AsyncOperation,
            Budget::Curl,
        ]
        .into_iter()
        .map(|budget| {
            let policy = ctx.config.policy(budget);
            BudgetRow {
                name: budget.name(),
                interval_secs: policy.interval().as_secs_f64(),
                timeout_secs: policy.timeout().as_secs_f64(),
            }
        })
        .collect();

        print_output(&rows, ctx.format);
        Ok(ExitCode::SUCCESS)
    }
}
