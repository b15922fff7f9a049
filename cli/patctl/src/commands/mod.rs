//! CLI commands.

mod budgets;
mod service;
mod wait;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pat_harness::{HarnessConfig, TestContext};

use crate::output::OutputFormat;

/// patctl - wait for an eventually-consistent platform to converge.
#[derive(Debug, Parser)]
#[command(name = "patctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Config file (JSON).
    #[arg(long, global = true, env = "PAT_CONFIG")]
    config: Option<PathBuf>,

    /// Act as the admin user.
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll a command until its output satisfies the given conditions.
    Wait(wait::WaitCommand),

    /// Wait for a service instance's last operation to succeed.
    AwaitService(service::AwaitServiceCommand),

    /// Wait for a service instance to disappear.
    AwaitAbsent(service::AwaitAbsentCommand),

    /// Show the resolved time budgets.
    Budgets(budgets::BudgetsCommand),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<ExitCode> {
        let config = crate::config::load(self.config)?;
        let context = TestContext::from_config(&config);
        let context = if self.admin {
            context.as_admin()
        } else {
            context
        };

        let ctx = CommandContext {
            config,
            context,
            format: self.format,
        };

        match self.command {
            Commands::Wait(cmd) => cmd.run(ctx).await,
            Commands::AwaitService(cmd) => cmd.run(ctx).await,
            Commands::AwaitAbsent(cmd) => cmd.run(ctx).await,
            Commands::Budgets(cmd) => cmd.run(ctx),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: HarnessConfig,
    pub context: TestContext,
    pub format: OutputFormat,
}
