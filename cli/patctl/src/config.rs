//! Config file discovery.
//!
//! Order: `--config` / `PAT_CONFIG`, then `config.json` in the user config
//! directory if it exists, then built-in defaults. `PAT_*` variables are
//! applied on top in every case.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use pat_harness::HarnessConfig;

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Default config file path, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "pat", "patctl").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load configuration.
pub fn load(explicit: Option<PathBuf>) -> Result<HarnessConfig> {
    let path = explicit.or_else(|| default_config_path().filter(|path| path.exists()));

    HarnessConfig::load_from(path.as_deref(), |key| std::env::var(key).ok()).with_context(|| {
        match &path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load config from environment".to_string(),
        }
    })
}
