//! Configuration loading, validation, and management for Rolecast.
//!
//! Loads configuration from `~/.rolecast/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use rolecast_core::ReentrancyMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `runtime.reentrancy`.
pub const ENV_REENTRANCY: &str = "ROLECAST_REENTRANCY";

/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "ROLECAST_LOG_LEVEL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// The root configuration structure.
///
/// Maps directly to `~/.rolecast/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine behaviour
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Parameters of the bundled money-transfer demo
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// How nested interaction calls are detected
    #[serde(default)]
    pub reentrancy: ReentrancyMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_source_balance")]
    pub source_balance: i64,

    #[serde(default)]
    pub target_balance: i64,

    #[serde(default = "default_amount")]
    pub amount: i64,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// How many transfers `rolecast transfer` runs
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

fn default_source_balance() -> i64 {
    1000
}
fn default_amount() -> i64 {
    200
}
fn default_currency() -> String {
    "€".into()
}
fn default_repetitions() -> u32 {
    5
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            source_balance: default_source_balance(),
            target_balance: 0,
            amount: default_amount(),
            currency: default_currency(),
            repetitions: default_repetitions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.rolecast/config.toml),
    /// then apply `ROLECAST_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply overrides read through `lookup` (the process environment in
    /// production).
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(mode) = lookup(ENV_REENTRANCY) {
            self.runtime.reentrancy = mode
                .parse()
                .map_err(|e: String| ConfigError::ValidationError(format!("{ENV_REENTRANCY}: {e}")))?;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level.trim().to_ascii_lowercase();
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rolecast")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self.demo.amount <= 0 {
            return Err(ConfigError::ValidationError(
                "demo.amount must be > 0".into(),
            ));
        }

        if self.demo.repetitions == 0 {
            return Err(ConfigError::ValidationError(
                "demo.repetitions must be >= 1".into(),
            ));
        }

        if self.demo.currency.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "demo.currency must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
