//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/replyscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/replyscope/` (~/.config/replyscope/)
//! - State/Logs: `$XDG_STATE_HOME/replyscope/` (~/.local/state/replyscope/)

use crate::error::{Error, Result};
use crate::types::ApiKeys;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding a single saved API key.
pub const API_KEY_ENV: &str = "REPLYSCOPE_API_KEY";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Remote API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Aggregation pipeline tuning
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API keys to aggregate across, in `sourceKeyIdx` order
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Items requested per page
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Retries after a rate-limited response
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds, doubled on each retry
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Optional per-request timeout in seconds (none by default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_keys: Vec::new(),
            page_limit: default_page_limit(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    /// First backoff delay as a `Duration`
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Resolve the API keys for a run.
    ///
    /// Sources are tried in order and the first non-empty one wins:
    /// explicit keys (CLI flags), the `REPLYSCOPE_API_KEY` environment
    /// variable, then `api.api_keys` from the config file.
    pub fn resolve_keys(&self, explicit: &[String]) -> Result<ApiKeys> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve_keys_from(explicit, env_key.as_deref(), &self.api_keys)
    }

    fn resolve_keys_from(
        explicit: &[String],
        env_key: Option<&str>,
        configured: &[String],
    ) -> Result<ApiKeys> {
        let has_any = |keys: &[String]| keys.iter().any(|k| !k.trim().is_empty());

        if has_any(explicit) {
            return ApiKeys::new(explicit.iter().cloned());
        }
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            return ApiKeys::new([key.to_string()]);
        }
        ApiKeys::new(configured.iter().cloned())
    }
}

fn default_base_url() -> String {
    "https://api.heyreach.io/api/public".to_string()
}

fn default_page_limit() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

/// What the aggregator does when one campaign's conversation fetch fails
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Annotate the failed campaign and keep the rest of the dataset
    #[default]
    FailSoft,
    /// Abort the whole run on the first failed campaign
    FailFast,
}

/// Aggregation configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AggregationConfig {
    /// Maximum per-campaign conversation fetches in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-campaign failure handling
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }
        if self.api.page_limit == 0 {
            return Err(Error::Config(
                "api.page_limit must be at least 1".to_string(),
            ));
        }
        if self.aggregation.concurrency == 0 {
            return Err(Error::Config(
                "aggregation.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/replyscope/config.toml` (~/.config/replyscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("replyscope").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/replyscope/` (~/.local/state/replyscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("replyscope")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/replyscope/replyscope.log`. The daily appender inserts
    /// the date before the extension (`replyscope.2025-01-31.log`).
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("replyscope.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
