//! Async operation tracking.
//!
//! Brokered resources report long-running work through a small vocabulary:
//! an operation kind (`create`, `update`, `delete`) and a state
//! (`in progress`, `succeeded`, `failed`). The tracker turns that vocabulary
//! into predicates for the poller:
//!
//! - [`await_operation_succeeded`]: `succeeded` converges, `failed` stops
//!   the poll with the remote message, anything else keeps polling.
//! - [`await_resource_absent`]: converges once the resource reports that it
//!   no longer exists. Deletion has no failure branch here.
//! - [`await_resource_absent_or_failed`]: deletion with an explicit failure
//!   vocabulary, for remote systems known to expose `delete failed`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::policy::PollPolicy;
use crate::poller::{poll, PollOutcome, Sampler};
use crate::predicate::{Predicate, Verdict};
use crate::snapshot::Snapshot;

/// Kind of a remote asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            other => Err(format!("unknown operation kind '{other}'")),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of an asynchronous operation as derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncOperationState {
    InProgress,
    Succeeded,
    Failed(String),
}

impl AsyncOperationState {
    /// Map a remote state word. Matching is exact.
    pub fn from_vocabulary(state: &str, message: Option<&str>) -> Option<Self> {
        match state {
            "in progress" | "initial" => Some(Self::InProgress),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed(
                message
                    .filter(|m| !m.is_empty())
                    .unwrap_or("operation failed")
                    .to_string(),
            )),
            _ => None,
        }
    }
}

/// Decoded last-operation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatus {
    pub kind: Option<OperationKind>,
    pub state: AsyncOperationState,
    pub message: Option<String>,
    pub percentage: Option<u8>,
}

impl OperationStatus {
    /// Parse CLI detail output containing `Status:` and `Message:` lines.
    ///
    /// ```text
    /// Status: create succeeded
    /// Message: 100 percent done
    /// ```
    pub fn from_cli_text(text: &str) -> Option<Self> {
        let status_line = field_line(text, "Status:")?;
        let message = field_line(text, "Message:").filter(|m| !m.is_empty());

        let (kind, state_words) = match status_line.split_once(' ') {
            Some((first, rest)) => match first.parse::<OperationKind>() {
                Ok(kind) => (Some(kind), rest.trim()),
                Err(_) => (None, status_line),
            },
            None => (None, status_line),
        };

        let state = match AsyncOperationState::from_vocabulary(state_words, message) {
            Some(AsyncOperationState::Failed(_)) if message.is_none() => {
                AsyncOperationState::Failed(status_line.to_string())
            }
            Some(state) => state,
            None => return None,
        };

        Some(Self {
            kind,
            state,
            message: message.map(str::to_string),
            percentage: message.and_then(percent_done),
        })
    }

    /// Parse a JSON resource carrying a `last_operation` object.
    ///
    /// Accepts the object at the top level, under `entity`, or on the first
    /// item of a `resources` list.
    pub fn from_json(value: &Value) -> Option<Self> {
        const POINTERS: [&str; 4] = [
            "/last_operation",
            "/entity/last_operation",
            "/resources/0/last_operation",
            "/resources/0/entity/last_operation",
        ];

        let operation = POINTERS
            .iter()
            .find_map(|pointer| value.pointer(pointer).filter(|v| v.is_object()))?;

        let message = operation
            .get("description")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty());
        let state = operation
            .get("state")
            .and_then(Value::as_str)
            .and_then(|state| AsyncOperationState::from_vocabulary(state, message))?;
        let kind = operation
            .get("type")
            .and_then(Value::as_str)
            .and_then(|kind| kind.parse().ok());

        Some(Self {
            kind,
            state,
            message: message.map(str::to_string),
            percentage: message.and_then(percent_done),
        })
    }

    /// Decode from a snapshot, preferring structured fields over text.
    pub fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
        if snapshot.is_failure() {
            return None;
        }
        snapshot
            .json()
            .and_then(Self::from_json)
            .or_else(|| Self::from_cli_text(&snapshot.text()))
    }
}

fn field_line<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
}

fn percent_done(message: &str) -> Option<u8> {
    let digits = message.trim().strip_suffix("percent done")?.trim();
    digits.parse::<u8>().ok().filter(|p| *p <= 100)
}

/// Derives an [`AsyncOperationState`] from a snapshot.
///
/// Extractors are only called with snapshots of successful samples.
pub trait StateExtractor: Send + Sync {
    fn extract(&self, snapshot: &Snapshot) -> AsyncOperationState;
}

impl<F> StateExtractor for F
where
    F: Fn(&Snapshot) -> AsyncOperationState + Send + Sync,
{
    fn extract(&self, snapshot: &Snapshot) -> AsyncOperationState {
        self(snapshot)
    }
}

/// Extractor for the last-operation vocabulary. Unrecognized output counts
/// as in progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastOperation;

impl StateExtractor for LastOperation {
    fn extract(&self, snapshot: &Snapshot) -> AsyncOperationState {
        OperationStatus::from_snapshot(snapshot)
            .map(|status| status.state)
            .unwrap_or(AsyncOperationState::InProgress)
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// Converges on `Succeeded`, stops on `Failed`.
pub struct OperationSucceeded<E> {
    extractor: E,
}

pub fn operation_succeeded<E: StateExtractor>(extractor: E) -> OperationSucceeded<E> {
    OperationSucceeded { extractor }
}

impl<E: StateExtractor> Predicate for OperationSucceeded<E> {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        match self.extractor.extract(snapshot) {
            AsyncOperationState::Succeeded => Verdict::Match,
            AsyncOperationState::InProgress => Verdict::NoMatch,
            AsyncOperationState::Failed(message) => Verdict::TerminalFailure(message),
        }
    }

    fn describe(&self) -> String {
        "operation succeeded".to_string()
    }
}

/// Converges when the absence check matches. Never terminal: a terminal
/// verdict from the inner check is treated as "still present".
pub struct ResourceAbsent<P> {
    absent: P,
}

pub fn resource_absent<P: Predicate>(absent: P) -> ResourceAbsent<P> {
    ResourceAbsent { absent }
}

impl<P: Predicate> Predicate for ResourceAbsent<P> {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        match self.absent.evaluate(snapshot) {
            Verdict::Match => Verdict::Match,
            _ => Verdict::NoMatch,
        }
    }

    fn describe(&self) -> String {
        format!("resource absent ({})", self.absent.describe())
    }
}

/// Deletion with a failure branch: converges on absence, stops on `Failed`.
pub struct AbsentOrFailed<P, E> {
    absent: P,
    extractor: E,
}

pub fn absent_or_failed<P: Predicate, E: StateExtractor>(
    absent: P,
    extractor: E,
) -> AbsentOrFailed<P, E> {
    AbsentOrFailed { absent, extractor }
}

impl<P: Predicate, E: StateExtractor> Predicate for AbsentOrFailed<P, E> {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        if self.absent.evaluate(snapshot).is_match() {
            return Verdict::Match;
        }
        match self.extractor.extract(snapshot) {
            AsyncOperationState::Failed(message) => Verdict::TerminalFailure(message),
            _ => Verdict::NoMatch,
        }
    }

    fn describe(&self) -> String {
        format!("resource absent ({}) without a failed operation", self.absent.describe())
    }
}

// =============================================================================
// Tracker entry points
// =============================================================================

/// Poll until the extracted operation state is `Succeeded`.
pub async fn await_operation_succeeded<S, E>(
    sampler: &S,
    extractor: E,
    policy: PollPolicy,
) -> PollOutcome
where
    S: Sampler + ?Sized,
    E: StateExtractor,
{
    poll(sampler, &operation_succeeded(extractor), policy).await
}

/// Poll until `absent` matches. Times out rather than failing terminally.
pub async fn await_resource_absent<S, P>(sampler: &S, absent: P, policy: PollPolicy) -> PollOutcome
where
    S: Sampler + ?Sized,
    P: Predicate,
{
    poll(sampler, &resource_absent(absent), policy).await
}

/// Poll until `absent` matches, stopping early if the operation reports `failed`.
pub async fn await_resource_absent_or_failed<S, P, E>(
    sampler: &S,
    absent: P,
    extractor: E,
    policy: PollPolicy,
) -> PollOutcome
where
    S: Sampler + ?Sized,
    P: Predicate,
    E: StateExtractor,
{
    poll(sampler, &absent_or_failed(absent, extractor), policy).await
}
