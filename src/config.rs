use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::diff::DEFAULT_EXCLUDE_PATTERNS;

const CONFIG_FILE: &str = ".review-context.toml";
const TRACKER_URL_ENV: &str = "REVIEW_CONTEXT_TRACKER_URL";
const TRACKER_TOKEN_ENV: &str = "REVIEW_CONTEXT_TRACKER_TOKEN";
const MAX_CONCURRENCY: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .review-context.toml.
/// Every section is optional; endpoints and credentials never have
/// built-in values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Ticket tracker access
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Diff parsing settings
    #[serde(default)]
    pub diff: DiffConfig,

    /// Historical PR data used to map diffs back to tickets
    #[serde(default)]
    pub pr_index: PrIndexConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Tracker base URL. If None, falls back to REVIEW_CONTEXT_TRACKER_URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Value sent as `Authorization: Basic <token>`. If None, falls back to
    /// REVIEW_CONTEXT_TRACKER_TOKEN.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many requested tickets are resolved at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffConfig {
    /// Files whose path contains any of these substrings are skipped
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrIndexConfig {
    /// JSON file with the historical pull request data
    #[serde(default = "default_pr_index_path")]
    pub path: PathBuf,
}

impl Default for PrIndexConfig {
    fn default() -> Self {
        Self {
            path: default_pr_index_path(),
        }
    }
}

fn default_pr_index_path() -> PathBuf {
    PathBuf::from("data/json/pull_request_data.json")
}

impl Config {
    /// Load configuration from .review-context.toml in the current directory,
    /// or the defaults if the file doesn't exist, then apply the
    /// environment fallbacks.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Config file values take precedence; the environment only fills gaps.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.tracker.base_url.is_none() {
            self.tracker.base_url = var(TRACKER_URL_ENV);
        }
        if self.tracker.auth_token.is_none() {
            self.tracker.auth_token = var(TRACKER_TOKEN_ENV);
        }
    }

    /// Concurrency clamped to a sane range.
    pub fn tracker_concurrency(&self) -> usize {
        self.tracker.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}
