//! Test doubles shared by the unit tests in this crate.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::poller::Sampler;
use crate::snapshot::{CommandOutput, Observation};

/// Replays a fixed script of observations; the last entry repeats forever.
pub(crate) struct ScriptedSampler {
    script: Vec<Observation>,
    calls: AtomicU32,
}

impl ScriptedSampler {
    /// Script of command outputs with exit code 0.
    pub(crate) fn new<I, S>(stdout: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_observations(
            stdout
                .into_iter()
                .map(|line| CommandOutput::new(0, line, "").into())
                .collect(),
        )
    }

    pub(crate) fn from_observations(script: Vec<Observation>) -> Self {
        assert!(!script.is_empty(), "script needs at least one observation");
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sampler for ScriptedSampler {
    async fn sample(&self) -> Observation {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let index = call.min(self.script.len() - 1);
        self.script[index].clone()
    }
}
