//! patctl - run one convergence wait from a shell.
//!
//! Exit codes: 0 converged, 1 timed out, 2 terminal failure, 3 usage or
//! configuration error.

use std::process::ExitCode;

use clap::Parser;

mod commands;
mod config;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    pat_harness::telemetry::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures. A failed
            // write of the message leaves nothing else to report.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(error::EXIT_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            error::print_error(&e);
            ExitCode::from(error::EXIT_ERROR)
        }
    }
}
