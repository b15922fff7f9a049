//! Error display for the CLI.

use colored::Colorize;
use pat_harness::HarnessError;

/// Exit code for usage and configuration errors.
pub const EXIT_ERROR: u8 = 3;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    let Some(harness_err) = err.downcast_ref::<HarnessError>() else {
        return;
    };
    let hint = match harness_err {
        HarnessError::Config(_) | HarnessError::ConfigFile { .. } | HarnessError::Policy(_) => {
            "Hint: Check the file named by PAT_CONFIG and the PAT_* environment variables."
        }
        HarnessError::Spawn { .. } => {
            "Hint: Check that the command exists and is on PATH (PAT_CLI_BIN for the platform client)."
        }
        HarnessError::Transport(_) => {
            "Hint: Check your network connection and PAT_API_URL."
        }
        HarnessError::Api { status: 401, .. } => {
            "Hint: The API token may have expired. Log in again."
        }
        HarnessError::Api { status: 403, .. } => {
            "Hint: The configured user may not have permission for this operation."
        }
        _ => return,
    };
    eprintln!("\n{}", hint.yellow());
}
