//! Error types for policies and convergence results.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contract violations detected before any sampling begins.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// Interval was zero.
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    /// Timeout was shorter than one interval, so no poll could take a second sample.
    #[error("poll timeout {timeout:?} is shorter than interval {interval:?}")]
    TimeoutShorterThanInterval {
        interval: Duration,
        timeout: Duration,
    },

    /// Timeout exceeds the longest supported poll.
    #[error("poll timeout {timeout:?} exceeds the maximum of {max:?}")]
    TimeoutTooLong { timeout: Duration, max: Duration },

    /// Timeout scale factor was zero, negative, or not finite.
    #[error("timeout scale must be a positive finite number, got {0}")]
    InvalidScale(f64),

    /// Budget name not in the vocabulary.
    #[error("unknown budget '{0}' (expected short, push, async or curl)")]
    UnknownBudget(String),

    /// Failure handling name not recognized.
    #[error("unknown failure handling '{0}' (expected distinct or uniform)")]
    UnknownFailureHandling(String),
}

/// A poll that did not converge, as reported to a scenario.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvergeError {
    /// The expected state was never observed within the budget.
    #[error(
        "timed out after {elapsed:?} ({samples} samples) waiting for {expectation}; last observed: {last_observed}"
    )]
    TimedOut {
        expectation: String,
        last_observed: String,
        samples: u32,
        elapsed: Duration,
    },

    /// The observed state proved the expectation can never be met.
    #[error("{expectation} can never be reached: {reason}; observed: {last_observed}")]
    TerminalFailure {
        expectation: String,
        reason: String,
        last_observed: String,
        samples: u32,
        elapsed: Duration,
    },

    /// Either of the above, reported without distinguishing them.
    #[error(
        "did not converge on {expectation} after {samples} samples ({detail}); last observed: {last_observed}"
    )]
    NotConverged {
        expectation: String,
        detail: String,
        last_observed: String,
        samples: u32,
        elapsed: Duration,
    },
}

impl ConvergeError {
    /// Returns true if this error came from an exhausted time budget.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::TimedOut { .. } => true,
            Self::NotConverged { detail, .. } => detail == "timed out",
            Self::TerminalFailure { .. } => false,
        }
    }

    /// Number of samples taken before giving up.
    pub fn samples(&self) -> u32 {
        match self {
            Self::TimedOut { samples, .. }
            | Self::TerminalFailure { samples, .. }
            | Self::NotConverged { samples, .. } => *samples,
        }
    }

    /// Summary of the last observed snapshot.
    pub fn last_observed(&self) -> &str {
        match self {
            Self::TimedOut { last_observed, .. }
            | Self::TerminalFailure { last_observed, .. }
            | Self::NotConverged { last_observed, .. } => last_observed,
        }
    }
}

/// How a scenario reports polls that end without converging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureHandling {
    /// Timeouts and terminal failures get different diagnostics.
    #[default]
    Distinct,

    /// Both are reported as "did not converge".
    Uniform,
}

impl FromStr for FailureHandling {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distinct" => Ok(Self::Distinct),
            "uniform" => Ok(Self::Uniform),
            other => Err(PolicyError::UnknownFailureHandling(other.to_string())),
        }
    }
}
