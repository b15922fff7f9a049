//! Output formatting for CLI commands.

use std::process::ExitCode;

use colored::Colorize;
use pat_converge::PollOutcome;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Summary of one finished wait.
#[derive(Debug, Serialize, Tabled)]
pub struct OutcomeReport {
    #[tabled(rename = "Outcome")]
    pub outcome: &'static str,
    #[tabled(rename = "Expectation")]
    pub expectation: String,
    #[tabled(rename = "Samples")]
    pub samples: u32,
    #[tabled(rename = "Elapsed")]
    pub elapsed: String,
    #[tabled(rename = "Last observed")]
    pub last_observed: String,
}

impl OutcomeReport {
    pub fn new(outcome: &PollOutcome, expectation: String) -> Self {
        let stats = outcome.stats();
        let (label, last_observed) = match outcome {
            PollOutcome::Converged { snapshot, .. } => ("converged", snapshot.summary()),
            PollOutcome::TimedOut { last, .. } => ("timed out", last.summary()),
            PollOutcome::TerminalFailure {
                snapshot, reason, ..
            } => ("terminal failure", format!("{reason}; {}", snapshot.summary())),
        };
        Self {
            outcome: label,
            expectation,
            samples: stats.samples,
            elapsed: format!("{:.1}s", stats.elapsed.as_secs_f64()),
            last_observed,
        }
    }
}

/// Exit code for a finished wait.
pub fn exit_code(outcome: &PollOutcome) -> ExitCode {
    match outcome {
        PollOutcome::Converged { .. } => ExitCode::SUCCESS,
        PollOutcome::TimedOut { .. } => ExitCode::from(1),
        PollOutcome::TerminalFailure { .. } => ExitCode::from(2),
    }
}

/// Print a wait summary and return the matching exit code.
pub fn print_outcome(outcome: &PollOutcome, expectation: String, format: OutputFormat) -> ExitCode {
    let report = OutcomeReport::new(outcome, expectation);
    match format {
        OutputFormat::Table => {
            let headline = match outcome {
                PollOutcome::Converged { .. } => "Converged:".green().bold(),
                PollOutcome::TimedOut { .. } => "Timed out:".yellow().bold(),
                PollOutcome::TerminalFailure { .. } => "Failed:".red().bold(),
            };
            println!("{} {}", headline, report.expectation);
            println!("{}", Table::new([&report]));
        }
        OutputFormat::Json => print_json(&report),
    }
    exit_code(outcome)
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => print_json(&data),
    }
}

fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("{} {}", "Error:".red().bold(), err),
    }
}
