//! Poll policies and the named budget vocabulary.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Longest timeout a policy accepts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Interval and timeout for one poll.
///
/// Constructed only through [`PollPolicy::new`], so every value satisfies
/// `interval > 0` and `interval <= timeout <= MAX_TIMEOUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    timeout: Duration,
}

impl PollPolicy {
    /// Validate and build a policy.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        if timeout < interval {
            return Err(PolicyError::TimeoutShorterThanInterval { interval, timeout });
        }
        if timeout > MAX_TIMEOUT {
            return Err(PolicyError::TimeoutTooLong {
                timeout,
                max: MAX_TIMEOUT,
            });
        }
        Ok(Self { interval, timeout })
    }

    /// Build a policy from whole seconds.
    pub fn from_secs(interval: u64, timeout: u64) -> Result<Self, PolicyError> {
        Self::new(Duration::from_secs(interval), Duration::from_secs(timeout))
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Multiply the timeout by `factor`, keeping the interval.
    ///
    /// The scaled timeout never drops below one interval.
    pub fn scaled(self, factor: f64) -> Result<Self, PolicyError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(PolicyError::InvalidScale(factor));
        }
        let timeout = Duration::try_from_secs_f64(self.timeout.as_secs_f64() * factor)
            .map_err(|_| PolicyError::InvalidScale(factor))?
            .max(self.interval);
        Self::new(self.interval, timeout)
    }

    /// Replace the timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, PolicyError> {
        Self::new(self.interval, timeout)
    }
}

/// Named time budgets. Callers select by intent; durations are tuned
/// centrally through a [`BudgetTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    /// Ordinary command and API round trips.
    Short,

    /// Push, start and staging.
    Push,

    /// Broker provisioning, update and deprovisioning.
    AsyncOperation,

    /// Route reachability probes.
    Curl,
}

impl Budget {
    /// Built-in policy for this budget.
    pub const fn default_policy(self) -> PollPolicy {
        let (interval, timeout) = match self {
            Budget::Short => (1, 30),
            Budget::Push => (2, 120),
            Budget::AsyncOperation => (15, 300),
            Budget::Curl => (1, 30),
        };
        PollPolicy {
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Budget::Short => "short",
            Budget::Push => "push",
            Budget::AsyncOperation => "async",
            Budget::Curl => "curl",
        }
    }
}

impl FromStr for Budget {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" | "default" => Ok(Budget::Short),
            "push" | "staging" => Ok(Budget::Push),
            "async" | "async_operation" | "async-operation" => Ok(Budget::AsyncOperation),
            "curl" | "route" => Ok(Budget::Curl),
            other => Err(PolicyError::UnknownBudget(other.to_string())),
        }
    }
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved policies for every budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetTable {
    short: PollPolicy,
    push: PollPolicy,
    async_operation: PollPolicy,
    curl: PollPolicy,
}

impl Default for BudgetTable {
    fn default() -> Self {
        Self {
            short: Budget::Short.default_policy(),
            push: Budget::Push.default_policy(),
            async_operation: Budget::AsyncOperation.default_policy(),
            curl: Budget::Curl.default_policy(),
        }
    }
}

impl BudgetTable {
    /// Default table with every timeout multiplied by `factor`.
    pub fn scaled(factor: f64) -> Result<Self, PolicyError> {
        let base = Self::default();
        Ok(Self {
            short: base.short.scaled(factor)?,
            push: base.push.scaled(factor)?,
            async_operation: base.async_operation.scaled(factor)?,
            curl: base.curl.scaled(factor)?,
        })
    }

    /// Policy for a budget.
    pub fn policy(&self, budget: Budget) -> PollPolicy {
        match budget {
            Budget::Short => self.short,
            Budget::Push => self.push,
            Budget::AsyncOperation => self.async_operation,
            Budget::Curl => self.curl,
        }
    }

    /// Override one budget.
    pub fn with(mut self, budget: Budget, policy: PollPolicy) -> Self {
        match budget {
            Budget::Short => self.short = policy,
            Budget::Push => self.push = policy,
            Budget::AsyncOperation => self.async_operation = policy,
            Budget::Curl => self.curl = policy,
        }
        self
    }

    /// Override every budget with the same policy (useful for fast fakes).
    pub fn uniform(policy: PollPolicy) -> Self {
        Self {
            short: policy,
            push: policy,
            async_operation: policy,
            curl: policy,
        }
    }
}
