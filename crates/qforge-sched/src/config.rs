//! Configuration management for the qforge pipeline.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `QFORGE_` prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use qforge_compile::{DEFAULT_TARGET, SUPPORTED_TARGETS};

use crate::store::RetryPolicy;

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stage execution settings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Persistence retry settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stage execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Time budget for a single stage, in seconds
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: u64,

    /// Compilation target used when a submission names none
    #[serde(default = "default_target")]
    pub default_target: String,

    /// Interval between status polls while waiting on a job, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process storage
    #[default]
    Memory,
    /// `SQLite` database file
    Sqlite,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type: "memory" or "sqlite"
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file for the sqlite backend
    #[serde(default)]
    pub path: Option<String>,
}

/// Retry settings for persistence calls during state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds; doubles per retry
    #[serde(default = "default_backoff")]
    pub backoff_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_stage_timeout() -> u64 {
    300
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn default_poll_interval() -> u64 {
    50
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stage_timeout_seconds: default_stage_timeout(),
            default_target: default_target(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => PipelineConfig::default(),
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables that are set override the current values; unparsable
    /// numbers are ignored.
    pub fn merge_env(mut self) -> Self {
        // Pipeline
        if let Ok(v) = std::env::var("QFORGE_STAGE_TIMEOUT") {
            if let Ok(val) = v.parse() {
                self.pipeline.stage_timeout_seconds = val;
            }
        }
        if let Ok(v) = std::env::var("QFORGE_DEFAULT_TARGET") {
            self.pipeline.default_target = v;
        }
        if let Ok(v) = std::env::var("QFORGE_POLL_INTERVAL_MS") {
            if let Ok(val) = v.parse() {
                self.pipeline.poll_interval_ms = val;
            }
        }

        // Storage
        if let Ok(v) = std::env::var("QFORGE_STORAGE_TYPE") {
            match v.as_str() {
                "memory" => self.storage.backend = StorageBackend::Memory,
                "sqlite" => self.storage.backend = StorageBackend::Sqlite,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("QFORGE_STORAGE_PATH") {
            self.storage.path = Some(v);
        }

        // Persistence
        if let Ok(v) = std::env::var("QFORGE_PERSISTENCE_MAX_ATTEMPTS") {
            if let Ok(val) = v.parse() {
                self.persistence.max_attempts = val;
            }
        }
        if let Ok(v) = std::env::var("QFORGE_PERSISTENCE_BACKOFF_MS") {
            if let Ok(val) = v.parse() {
                self.persistence.backoff_ms = val;
            }
        }

        // Logging
        if let Ok(v) = std::env::var("QFORGE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("QFORGE_LOG_FORMAT") {
            self.logging.format = v;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.stage_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "stage_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !SUPPORTED_TARGETS.contains(&self.pipeline.default_target.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Unsupported default target: {}",
                self.pipeline.default_target
            )));
        }

        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.path.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::ValidationError(
                "sqlite storage requires a database path".to_string(),
            ));
        }

        if self.persistence.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "persistence.max_attempts must be at least 1".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Time budget for a single stage.
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.stage_timeout_seconds)
    }

    /// Interval between status polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.pipeline.poll_interval_ms)
    }

    /// Persistence retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.persistence.max_attempts,
            backoff: Duration::from_millis(self.persistence.backoff_ms),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.pipeline.stage_timeout_seconds, 300);
        assert_eq!(config.pipeline.default_target, "qasm");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.persistence.max_attempts, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = PipelineConfig::from_yaml(
            r#"
pipeline:
  stage_timeout_seconds: 10
storage:
  backend: sqlite
  path: /tmp/qforge.db
"#,
        )
        .unwrap();

        assert_eq!(config.stage_timeout(), Duration::from_secs(10));
        assert_eq!(config.pipeline.default_target, "qasm");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/qforge.db"));
        assert_eq!(config.retry_policy().backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.pipeline.stage_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.pipeline.default_target = "quil".into();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        let err = PipelineConfig::from_yaml("storage:\n  backend: postgres\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
