//! Command client.
//!
//! Every invocation spawns a fresh process with the context's environment
//! and is killed if it outlives its per-call timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pat_converge::CommandOutput;
use tokio::process::Command;
use tracing::debug;

use crate::config::HarnessConfig;
use crate::context::TestContext;
use crate::error::HarnessError;

/// Runs one command-line client action.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `args` as `context`. A non-zero exit is a successful run; only
    /// spawn failures and timeouts are errors.
    async fn run(
        &self,
        context: &TestContext,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HarnessError>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    async fn run(
        &self,
        context: &TestContext,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HarnessError> {
        (**self).run(context, args, timeout).await
    }
}

/// Collect string-like arguments.
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Render a command line for logs and errors.
pub fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs commands as child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.cli_bin.clone())
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        context: &TestContext,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HarnessError> {
        let rendered = render(&self.program, args);
        debug!(command = %rendered, user = %context.user().username, "Running command");

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .envs(context.command_env())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result.map_err(|source| HarnessError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(HarnessError::CommandTimedOut {
                    command: rendered,
                    timeout,
                })
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(command = %rendered, exit_code, "Command finished");

        Ok(CommandOutput::new(
            exit_code,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }
}
