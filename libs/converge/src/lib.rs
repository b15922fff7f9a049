//! Convergence polling primitives.
//!
//! This library provides the machinery acceptance tests use to wait on an
//! eventually-consistent platform. Key concepts:
//!
//! - **Snapshot**: One immutable observation of remote state.
//! - **Predicate**: A pure decision over a snapshot: match, keep polling, or
//!   stop because the expectation can never be met.
//! - **Convergence**: Sampling repeatedly until the predicate matches, a
//!   terminal failure is observed, or the time budget runs out.
//!
//! # Invariants
//!
//! - Every poll takes at least one sample
//! - Samples within one poll are strictly sequential
//! - A terminal failure ends the poll regardless of remaining budget
//! - Predicates hold no state; re-evaluating a snapshot yields the same verdict

mod error;
pub mod operation;
pub mod pattern;
mod policy;
mod poller;
pub mod predicate;
mod snapshot;

#[cfg(test)]
mod testing;

pub use error::{ConvergeError, FailureHandling, PolicyError};
pub use operation::{
    await_operation_succeeded, await_resource_absent, await_resource_absent_or_failed,
    AsyncOperationState, LastOperation, OperationKind, OperationStatus, StateExtractor,
};
pub use pattern::Pattern;
pub use policy::{Budget, BudgetTable, PollPolicy, MAX_TIMEOUT};
pub use poller::{poll, sampler_fn, FnSampler, PollOutcome, PollStats, Sampler};
pub use predicate::{Predicate, PredicateExt, Verdict};
pub use snapshot::{CommandOutput, HttpResponse, Observation, ResponseBody, Snapshot};
