//! Conditions evaluated against snapshots.
//!
//! A [`Predicate`] is a pure function from a [`Snapshot`] to a [`Verdict`].
//! `NoMatch` means keep polling; `TerminalFailure` means the expectation can
//! never be met and the poll must stop now.
//!
//! Leaf predicates in this module classify a sampling-failure snapshot as
//! `NoMatch`, so transient collaborator errors are retried by the poll loop
//! and never satisfy an expectation, positive or negative.

use std::sync::Arc;

use serde_json::Value;

use crate::pattern::Pattern;
use crate::snapshot::Snapshot;

/// Result of evaluating a predicate against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The expected condition holds.
    Match,

    /// The condition does not hold yet.
    NoMatch,

    /// The condition can never hold; stop polling.
    TerminalFailure(String),
}

impl Verdict {
    pub fn from_bool(matched: bool) -> Self {
        if matched {
            Self::Match
        } else {
            Self::NoMatch
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminalFailure(_))
    }
}

/// A condition over a snapshot.
pub trait Predicate: Send + Sync {
    /// Evaluate the condition.
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict;

    /// Human-readable description of the expected state.
    fn describe(&self) -> String;
}

impl<P: Predicate + ?Sized> Predicate for &P {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        (**self).evaluate(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<P: Predicate + ?Sized> Predicate for Box<P> {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        (**self).evaluate(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<P: Predicate + ?Sized> Predicate for Arc<P> {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        (**self).evaluate(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Combinators available on every predicate.
pub trait PredicateExt: Predicate + Sized {
    /// Both conditions must match.
    fn and<P: Predicate + 'static>(self, other: P) -> All
    where
        Self: 'static,
    {
        All(vec![Box::new(self), Box::new(other)])
    }

    /// Invert the condition.
    fn not(self) -> Not<Self> {
        Not(self)
    }

    /// Stop with a terminal failure when `needle` appears, otherwise defer
    /// to this predicate.
    fn or_fail_on(self, needle: impl Into<String>, reason: impl Into<String>) -> All
    where
        Self: 'static,
    {
        All(vec![Box::new(fails_on(needle, reason)), Box::new(self)])
    }

    fn boxed(self) -> Box<dyn Predicate>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<P: Predicate> PredicateExt for P {}

// =============================================================================
// Text predicates
// =============================================================================

/// Text contains a substring (case-sensitive).
#[derive(Debug, Clone)]
pub struct Contains(String);

pub fn contains(needle: impl Into<String>) -> Contains {
    Contains(needle.into())
}

impl Predicate for Contains {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        Verdict::from_bool(snapshot.text().contains(self.0.as_str()))
    }

    fn describe(&self) -> String {
        format!("output contains {:?}", self.0)
    }
}

/// Text contains every one of a set of substrings.
#[derive(Debug, Clone)]
pub struct ContainsAll(Vec<String>);

pub fn contains_all<I, S>(needles: I) -> ContainsAll
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ContainsAll(needles.into_iter().map(Into::into).collect())
}

impl Predicate for ContainsAll {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        let text = snapshot.text();
        Verdict::from_bool(self.0.iter().all(|needle| text.contains(needle.as_str())))
    }

    fn describe(&self) -> String {
        format!("output contains all of {:?}", self.0)
    }
}

/// Text does not contain a substring.
///
/// Unlike `contains(..).not()`, this reads as a leaf in descriptions.
#[derive(Debug, Clone)]
pub struct Excludes(String);

pub fn excludes(needle: impl Into<String>) -> Excludes {
    Excludes(needle.into())
}

impl Predicate for Excludes {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        Verdict::from_bool(!snapshot.text().contains(self.0.as_str()))
    }

    fn describe(&self) -> String {
        format!("output does not contain {:?}", self.0)
    }
}

/// Terminal failure when a substring appears; `Match` otherwise.
///
/// Only meaningful inside a conjunction, where it acts as a guard.
#[derive(Debug, Clone)]
pub struct FailsOn {
    needle: String,
    reason: String,
}

pub fn fails_on(needle: impl Into<String>, reason: impl Into<String>) -> FailsOn {
    FailsOn {
        needle: needle.into(),
        reason: reason.into(),
    }
}

impl Predicate for FailsOn {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        let text = snapshot.text();
        match text.find(self.needle.as_str()) {
            Some(pos) => {
                let line = line_at(&text, pos);
                Verdict::TerminalFailure(format!("{}: {}", self.reason, line))
            }
            None => Verdict::Match,
        }
    }

    fn describe(&self) -> String {
        format!("output never contains {:?}", self.needle)
    }
}

fn line_at(text: &str, pos: usize) -> &str {
    let start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
    text[start..end].trim()
}

/// The pattern matches the token between `prefix` and `suffix` somewhere in
/// the text.
#[derive(Debug, Clone)]
pub struct TextMatchesAfter {
    prefix: String,
    suffix: String,
    pattern: Pattern,
}

pub fn text_matches_after(
    prefix: impl Into<String>,
    pattern: Pattern,
    suffix: impl Into<String>,
) -> TextMatchesAfter {
    TextMatchesAfter {
        prefix: prefix.into(),
        suffix: suffix.into(),
        pattern,
    }
}

impl Predicate for TextMatchesAfter {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        Verdict::from_bool(self.pattern.matches_after(
            &snapshot.text(),
            &self.prefix,
            &self.suffix,
        ))
    }

    fn describe(&self) -> String {
        format!("{} after {:?}", self.pattern, self.prefix)
    }
}

// =============================================================================
// Exit code / status predicates
// =============================================================================

/// Command exited with the given code.
#[derive(Debug, Clone, Copy)]
pub struct ExitCode(i32);

pub fn exit_code(code: i32) -> ExitCode {
    ExitCode(code)
}

impl Predicate for ExitCode {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        Verdict::from_bool(snapshot.exit_code() == Some(self.0))
    }

    fn describe(&self) -> String {
        format!("exit code {}", self.0)
    }
}

/// HTTP response has the given status.
#[derive(Debug, Clone, Copy)]
pub struct Status(u16);

pub fn status(code: u16) -> Status {
    Status(code)
}

impl Predicate for Status {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        Verdict::from_bool(snapshot.status() == Some(self.0))
    }

    fn describe(&self) -> String {
        format!("HTTP status {}", self.0)
    }
}

// =============================================================================
// Structured field predicates
// =============================================================================

/// A structured field equals a value exactly (no normalization).
#[derive(Debug, Clone)]
pub struct FieldEquals {
    pointer: String,
    expected: Value,
}

pub fn field_equals(pointer: impl Into<String>, expected: impl Into<Value>) -> FieldEquals {
    FieldEquals {
        pointer: pointer.into(),
        expected: expected.into(),
    }
}

impl Predicate for FieldEquals {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        Verdict::from_bool(snapshot.field(&self.pointer) == Some(&self.expected))
    }

    fn describe(&self) -> String {
        format!("{} == {}", self.pointer, self.expected)
    }
}

/// A structured field has the shape of a pattern.
///
/// Numeric fields are matched on their decimal rendering.
#[derive(Debug, Clone)]
pub struct FieldMatches {
    pointer: String,
    pattern: Pattern,
}

pub fn field_matches(pointer: impl Into<String>, pattern: Pattern) -> FieldMatches {
    FieldMatches {
        pointer: pointer.into(),
        pattern,
    }
}

impl Predicate for FieldMatches {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        let matched = match snapshot.field(&self.pointer) {
            Some(Value::String(s)) => self.pattern.matches(s),
            Some(Value::Number(n)) => self.pattern.matches(&n.to_string()),
            Some(other @ Value::Array(_)) => self.pattern.matches(&other.to_string()),
            _ => false,
        };
        Verdict::from_bool(matched)
    }

    fn describe(&self) -> String {
        format!("{} is {}", self.pointer, self.pattern)
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// Conjunction. The first terminal failure wins; otherwise every member must
/// match.
pub struct All(Vec<Box<dyn Predicate>>);

pub fn all(predicates: Vec<Box<dyn Predicate>>) -> All {
    All(predicates)
}

impl All {
    /// Add another required condition.
    pub fn and<P: Predicate + 'static>(mut self, other: P) -> All {
        self.0.push(Box::new(other));
        self
    }
}

impl Predicate for All {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        let mut verdict = Verdict::Match;
        for predicate in &self.0 {
            match predicate.evaluate(snapshot) {
                Verdict::TerminalFailure(reason) => return Verdict::TerminalFailure(reason),
                Verdict::NoMatch => verdict = Verdict::NoMatch,
                Verdict::Match => {}
            }
        }
        verdict
    }

    fn describe(&self) -> String {
        self.0
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Negation. Terminal failures pass through unchanged; a sampling-failure
/// snapshot never matches.
#[derive(Debug, Clone)]
pub struct Not<P>(P);

impl<P: Predicate> Predicate for Not<P> {
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        if snapshot.is_failure() {
            return Verdict::NoMatch;
        }
        match self.0.evaluate(snapshot) {
            Verdict::Match => Verdict::NoMatch,
            Verdict::NoMatch => Verdict::Match,
            terminal @ Verdict::TerminalFailure(_) => terminal,
        }
    }

    fn describe(&self) -> String {
        format!("not ({})", self.0.describe())
    }
}

/// A predicate built from a closure.
pub struct FnPredicate<F> {
    description: String,
    f: F,
}

pub fn from_fn<F>(description: impl Into<String>, f: F) -> FnPredicate<F>
where
    F: Fn(&Snapshot) -> Verdict + Send + Sync,
{
    FnPredicate {
        description: description.into(),
        f,
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Snapshot) -> Verdict + Send + Sync,
{
    fn evaluate(&self, snapshot: &Snapshot) -> Verdict {
        (self.f)(snapshot)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
