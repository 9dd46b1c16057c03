//! Configuration system for the MemoDrops admin client
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/memodrops/config.{MEMODROPS_ENV}.json
//! 3. Default values
//!
//! Where MEMODROPS_ENV can be: production (default), development, test
//!
//! # Examples
//!
//! ```no_run
//! use memodrops::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Backend: {}", config.api_url);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - MEMODROPS_API_URL
//! - MEMODROPS_API_TOKEN
//! - MEMODROPS_ITEM_DELAY_MS
//! - MEMODROPS_POLL_INTERVAL_MS

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::Credential;
use crate::batch::{RetryPolicy, RunnerConfig};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Retry settings for transient per-item failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one; 0 disables retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Parameters sent with every `gerar-drops-lote` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropsConfig {
    /// Max subtopics per contest (`limite`)
    #[serde(default = "default_drops_limit")]
    pub limit: u32,

    /// `priorizar_por_incidencia`
    #[serde(default = "default_true")]
    pub prioritize_by_incidence: bool,
}

fn default_drops_limit() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for DropsConfig {
    fn default() -> Self {
        Self {
            limit: default_drops_limit(),
            prioritize_by_incidence: true,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token, or the name of an environment variable holding it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Cool-down between two batch items
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,

    /// Deadline for one item, retries excluded
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,

    /// Fleet status poll interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub drops: DropsConfig,

    /// Run history database (default: ~/.local/share/memodrops/history.db)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

fn default_api_url() -> String {
    "https://api.memodrops.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_item_delay() -> u64 {
    2000
}

fn default_item_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout(),
            item_delay_ms: default_item_delay(),
            item_timeout_secs: default_item_timeout(),
            poll_interval_ms: default_poll_interval(),
            retry: RetryConfig::default(),
            drops: DropsConfig::default(),
            db_path: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/memodrops/config.{MEMODROPS_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("MEMODROPS_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = Self::config_dir() {
            let config_path = config_dir.join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MEMODROPS_API_URL") {
            self.api_url = url;
        }

        if let Ok(token) = std::env::var("MEMODROPS_API_TOKEN") {
            self.api_token = Some(token);
        }

        if let Some(ms) = env_u64("MEMODROPS_ITEM_DELAY_MS") {
            self.item_delay_ms = ms;
        }

        if let Some(ms) = env_u64("MEMODROPS_POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api_url must be an http(s) URL, got {}",
                self.api_url
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.item_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "item_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.drops.limit == 0 {
            return Err(ConfigError::ValidationError(
                "drops.limit must be greater than 0".to_string(),
            ));
        }

        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::ValidationError(
                "retry.base_backoff_ms cannot exceed retry.max_backoff_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the token from an environment variable if needed
    pub fn resolve_api_token(&self) -> Option<String> {
        self.api_token.as_ref().and_then(|key| {
            // If the key looks like an env var name, try to resolve it
            if !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                std::env::var(key).ok()
            } else {
                Some(key.clone())
            }
        })
    }

    pub fn credential(&self) -> Option<Credential> {
        self.resolve_api_token().and_then(Credential::new)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            delay: Duration::from_millis(self.item_delay_ms),
            item_timeout: Some(Duration::from_secs(self.item_timeout_secs)),
            retry: self.retry.policy(),
        }
    }

    /// History database path, falling back to the platform data dir
    pub fn history_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "memodrops", "memodrops")
                .map(|dirs| dirs.data_dir().join("history.db"))
                .unwrap_or_else(|| PathBuf::from("memodrops-history.db"))
        })
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("memodrops"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}
