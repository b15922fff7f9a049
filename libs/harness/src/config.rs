//! Harness configuration.
//!
//! Handles:
//! - Platform endpoints (API URL, apps domain, optional router address)
//! - Admin and regular user credentials
//! - Timeout scaling and failure reporting policy
//!
//! Values come from an optional JSON file and are then overridden by
//! `PAT_*` environment variables.

use std::path::{Path, PathBuf};

use pat_converge::{Budget, BudgetTable, FailureHandling, PollPolicy};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "PAT_CONFIG";

/// Harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Management API URL.
    pub api_url: String,

    /// Domain under which pushed apps get routes.
    pub apps_domain: String,

    /// Address of the platform router. When set, route probes connect here
    /// and carry the route in the `Host` header.
    pub router_url: Option<String>,

    /// Command-line client executable.
    pub cli_bin: String,

    pub admin_user: String,
    pub admin_password: String,
    pub user: String,
    pub password: String,

    /// Org and space to target. Scenarios create their own when unset.
    pub org: Option<String>,
    pub space: Option<String>,

    pub skip_ssl_validation: bool,

    /// Multiplier applied to every budget timeout.
    pub timeout_scale: f64,

    /// How polls that end without converging are reported.
    pub failure_handling: FailureHandling,

    /// Times a timed-out wait is re-run before the scenario fails.
    pub scenario_retries: u32,

    #[serde(skip)]
    budgets: BudgetTable,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.bosh-lite.com".to_string(),
            apps_domain: "bosh-lite.com".to_string(),
            router_url: None,
            cli_bin: "cf".to_string(),
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
            user: "pat-user".to_string(),
            password: "pat-password".to_string(),
            org: None,
            space: None,
            skip_ssl_validation: false,
            timeout_scale: 1.0,
            failure_handling: FailureHandling::Distinct,
            scenario_retries: 0,
            budgets: BudgetTable::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from the file named by `PAT_CONFIG` (if any) and the process
    /// environment.
    pub fn load() -> Result<Self, HarnessError> {
        let path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        Self::load_from(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load from an optional file, then apply overrides from `env`.
    pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        base.with_env(env)?.validated()
    }

    fn read_file(path: &Path) -> Result<Self, HarnessError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigFile {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn with_env<F>(mut self, env: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, target: &mut String| {
            if let Some(value) = env(key) {
                *target = value;
            }
        };
        string("PAT_API_URL", &mut self.api_url);
        string("PAT_APPS_DOMAIN", &mut self.apps_domain);
        string("PAT_CLI_BIN", &mut self.cli_bin);
        string("PAT_ADMIN_USER", &mut self.admin_user);
        string("PAT_ADMIN_PASSWORD", &mut self.admin_password);
        string("PAT_USER", &mut self.user);
        string("PAT_PASSWORD", &mut self.password);

        if let Some(url) = env("PAT_ROUTER_URL") {
            self.router_url = Some(url);
        }
        if let Some(org) = env("PAT_ORG") {
            self.org = Some(org);
        }
        if let Some(space) = env("PAT_SPACE") {
            self.space = Some(space);
        }
        if let Some(value) = env("PAT_SKIP_SSL_VALIDATION") {
            self.skip_ssl_validation = matches!(value.trim(), "1" | "true" | "yes");
        }
        if let Some(value) = env("PAT_TIMEOUT_SCALE") {
            self.timeout_scale = value.trim().parse().map_err(|_| {
                HarnessError::config(format!("PAT_TIMEOUT_SCALE must be a number, got '{value}'"))
            })?;
        }
        if let Some(value) = env("PAT_FAILURE_HANDLING") {
            self.failure_handling = value.parse()?;
        }
        if let Some(value) = env("PAT_SCENARIO_RETRIES") {
            self.scenario_retries = value.trim().parse().map_err(|_| {
                HarnessError::config(format!(
                    "PAT_SCENARIO_RETRIES must be a non-negative integer, got '{value}'"
                ))
            })?;
        }
        Ok(self)
    }

    /// Check invariants and resolve the budget table.
    pub fn validated(mut self) -> Result<Self, HarnessError> {
        if self.api_url.trim().is_empty() {
            return Err(HarnessError::config("api_url must not be empty"));
        }
        if self.apps_domain.trim().is_empty() {
            return Err(HarnessError::config("apps_domain must not be empty"));
        }
        if self.cli_bin.trim().is_empty() {
            return Err(HarnessError::config("cli_bin must not be empty"));
        }
        self.budgets = BudgetTable::scaled(self.timeout_scale)?;
        Ok(self)
    }

    /// Replace the resolved budgets, e.g. with millisecond policies for fakes.
    pub fn with_budgets(mut self, budgets: BudgetTable) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn budgets(&self) -> &BudgetTable {
        &self.budgets
    }

    /// Policy for a named budget.
    pub fn policy(&self, budget: Budget) -> PollPolicy {
        self.budgets.policy(budget)
    }
}
