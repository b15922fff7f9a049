//! Error types for the harness.

use std::time::Duration;

use pat_converge::{ConvergeError, PolicyError};
use thiserror::Error;

/// Errors raised by collaborators, configuration and scenarios.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("failed to read {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' did not finish within {timeout:?}")]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("'{command}' exited with {exit_code}: {output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Converge(#[from] ConvergeError),

    #[error("step '{step}' failed: {detail}")]
    Step { step: String, detail: String },
}

impl HarnessError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn step(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            detail: detail.into(),
        }
    }

    /// Returns true if this error is a convergence timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Converge(err) if err.is_timeout())
    }
}
