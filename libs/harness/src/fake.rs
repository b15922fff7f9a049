//! In-memory command runner for tests.
//!
//! Responses are registered per argument prefix. Each rule replays its
//! outputs in order and then repeats the last one. The longest matching
//! prefix wins; among equal prefixes the most recent registration wins.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use pat_converge::CommandOutput;

use crate::cli::CommandRunner;
use crate::context::TestContext;
use crate::error::HarnessError;

struct Rule {
    prefix: Vec<String>,
    outputs: Vec<CommandOutput>,
    served: usize,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub user: String,
    pub args: Vec<String>,
}

/// Scripted [`CommandRunner`].
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register outputs for commands starting with `prefix`.
    pub fn on<I, S>(&self, prefix: I, outputs: Vec<CommandOutput>) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        assert!(!outputs.is_empty(), "a rule needs at least one output");
        lock(&self.rules).push(Rule {
            prefix: prefix.into_iter().map(Into::into).collect(),
            outputs,
            served: 0,
        });
        self
    }

    /// Register a single successful output.
    pub fn ok<I, S>(&self, prefix: I, stdout: &str) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on(prefix, vec![CommandOutput::new(0, stdout, "")])
    }

    /// Register stdout lines served one per call, each with exit code 0.
    pub fn sequence<I, S>(&self, prefix: I, stdouts: &[&str]) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on(
            prefix,
            stdouts
                .iter()
                .map(|stdout| CommandOutput::new(0, *stdout, ""))
                .collect(),
        )
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls whose arguments start with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| {
                call.args.len() >= prefix.len()
                    && call.args.iter().zip(prefix).all(|(a, p)| a == p)
            })
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        context: &TestContext,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, HarnessError> {
        lock(&self.calls).push(RecordedCall {
            user: context.user().username.clone(),
            args: args.to_vec(),
        });

        let mut rules = lock(&self.rules);
        let rule = rules
            .iter_mut()
            .enumerate()
            .filter(|(_, rule)| args.starts_with(&rule.prefix))
            .max_by_key(|(index, rule)| (rule.prefix.len(), *index))
            .map(|(_, rule)| rule);

        let Some(rule) = rule else {
            return Ok(CommandOutput::new(
                1,
                "FAILED",
                format!("no scripted response for '{}'", args.join(" ")),
            ));
        };

        let index = rule.served.min(rule.outputs.len() - 1);
        rule.served += 1;
        Ok(rule.outputs[index].clone())
    }
}
