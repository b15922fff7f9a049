//! The convergence poller.
//!
//! A poll drives a [`Sampler`] and a [`Predicate`] until the predicate
//! matches, reports a terminal failure, or the policy's timeout elapses:
//!
//! ```text
//! Idle -> Sampling -> Evaluating -> Sampling (NoMatch, time left)
//!                               \-> Converged | TerminalFailure | TimedOut
//! ```
//!
//! The first sample is unconditional, so every outcome carries a snapshot.
//! The deadline is checked after evaluating each sample and before sleeping;
//! the sleep is clamped to the remaining budget, so a poll whose next
//! interval would cross the deadline still takes one final sample at the
//! deadline and never starts a sleep once the deadline has passed.
//!
//! The loop has no cancellation point of its own. Callers that need an outer
//! deadline race the poll against it (`tokio::time::timeout`) and discard the
//! result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{ConvergeError, FailureHandling};
use crate::policy::PollPolicy;
use crate::predicate::{Predicate, Verdict};
use crate::snapshot::{Observation, Snapshot};

/// Takes one observation of remote state.
///
/// Implementations must be safe to call repeatedly and must not leak
/// per-call resources. A collaborator call that fails to complete is reported
/// as [`Observation::Failure`] rather than an error, so the predicate decides
/// whether it is retryable.
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self) -> Observation;
}

#[async_trait]
impl<S: Sampler + ?Sized> Sampler for &S {
    async fn sample(&self) -> Observation {
        (**self).sample().await
    }
}

#[async_trait]
impl<S: Sampler + ?Sized> Sampler for Box<S> {
    async fn sample(&self) -> Observation {
        (**self).sample().await
    }
}

#[async_trait]
impl<S: Sampler + ?Sized> Sampler for Arc<S> {
    async fn sample(&self) -> Observation {
        (**self).sample().await
    }
}

/// A sampler backed by an async closure.
pub struct FnSampler<F>(F);

/// Build a sampler from an async closure.
pub fn sampler_fn<F, Fut>(f: F) -> FnSampler<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Observation> + Send,
{
    FnSampler(f)
}

#[async_trait]
impl<F, Fut> Sampler for FnSampler<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Observation> + Send,
{
    async fn sample(&self) -> Observation {
        (self.0)().await
    }
}

/// Counters describing how a poll ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    /// Number of samples taken (always at least one).
    pub samples: u32,

    /// Time from the first sample starting to the outcome being decided.
    pub elapsed: Duration,
}

/// The single result of a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The predicate matched.
    Converged { snapshot: Snapshot, stats: PollStats },

    /// The budget ran out; carries the last snapshot.
    TimedOut { last: Snapshot, stats: PollStats },

    /// The predicate reported that convergence is impossible.
    TerminalFailure {
        snapshot: Snapshot,
        reason: String,
        stats: PollStats,
    },
}

impl PollOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::TerminalFailure { .. })
    }

    /// The last snapshot taken.
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Converged { snapshot, .. } | Self::TerminalFailure { snapshot, .. } => snapshot,
            Self::TimedOut { last, .. } => last,
        }
    }

    pub fn stats(&self) -> PollStats {
        match self {
            Self::Converged { stats, .. }
            | Self::TimedOut { stats, .. }
            | Self::TerminalFailure { stats, .. } => *stats,
        }
    }

    /// Terminal failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::TerminalFailure { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Convert into a pass/fail result for a scenario.
    pub fn into_result(
        self,
        expectation: impl Into<String>,
        handling: FailureHandling,
    ) -> Result<Snapshot, ConvergeError> {
        let expectation = expectation.into();
        match (self, handling) {
            (Self::Converged { snapshot, .. }, _) => Ok(snapshot),
            (Self::TimedOut { last, stats }, FailureHandling::Distinct) => {
                Err(ConvergeError::TimedOut {
                    expectation,
                    last_observed: last.summary(),
                    samples: stats.samples,
                    elapsed: stats.elapsed,
                })
            }
            (
                Self::TerminalFailure {
                    snapshot,
                    reason,
                    stats,
                },
                FailureHandling::Distinct,
            ) => Err(ConvergeError::TerminalFailure {
                expectation,
                reason,
                last_observed: snapshot.summary(),
                samples: stats.samples,
                elapsed: stats.elapsed,
            }),
            (Self::TimedOut { last, stats }, FailureHandling::Uniform) => {
                Err(ConvergeError::NotConverged {
                    expectation,
                    detail: "timed out".to_string(),
                    last_observed: last.summary(),
                    samples: stats.samples,
                    elapsed: stats.elapsed,
                })
            }
            (
                Self::TerminalFailure {
                    snapshot,
                    reason,
                    stats,
                },
                FailureHandling::Uniform,
            ) => Err(ConvergeError::NotConverged {
                expectation,
                detail: reason,
                last_observed: snapshot.summary(),
                samples: stats.samples,
                elapsed: stats.elapsed,
            }),
        }
    }
}

/// Poll until the predicate matches, fails terminally, or the timeout elapses.
pub async fn poll<S, P>(sampler: &S, predicate: &P, policy: PollPolicy) -> PollOutcome
where
    S: Sampler + ?Sized,
    P: Predicate + ?Sized,
{
    let span = info_span!(
        "poll",
        expectation = %predicate.describe(),
        interval = ?policy.interval(),
        timeout = ?policy.timeout(),
    );
    run(sampler, predicate, policy).instrument(span).await
}

async fn run<S, P>(sampler: &S, predicate: &P, policy: PollPolicy) -> PollOutcome
where
    S: Sampler + ?Sized,
    P: Predicate + ?Sized,
{
    let started = Instant::now();
    let deadline = started + policy.timeout();
    let mut samples: u32 = 0;

    loop {
        samples = samples.saturating_add(1);
        let snapshot = Snapshot::new(samples, sampler.sample().await);
        let verdict = predicate.evaluate(&snapshot);
        let stats = PollStats {
            samples,
            elapsed: started.elapsed(),
        };

        debug!(
            sample = samples,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            sampling_failed = snapshot.is_failure(),
            verdict = ?verdict,
            "Evaluated sample"
        );

        match verdict {
            Verdict::Match => {
                info!(samples, elapsed = ?stats.elapsed, "Converged");
                return PollOutcome::Converged { snapshot, stats };
            }
            Verdict::TerminalFailure(reason) => {
                warn!(samples, reason = %reason, "Terminal failure observed");
                return PollOutcome::TerminalFailure {
                    snapshot,
                    reason,
                    stats,
                };
            }
            Verdict::NoMatch => {}
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(
                samples,
                elapsed = ?stats.elapsed,
                last = %snapshot.summary(),
                "Timed out waiting for convergence"
            );
            return PollOutcome::TimedOut {
                last: snapshot,
                stats,
            };
        }

        sleep(policy.interval().min(deadline - now)).await;
    }
}
