//! Engine configuration model.

use serde::{Deserialize, Serialize};

/// Main configuration structure for Redline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Interpretation backend configuration
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Interpretation backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InterpreterConfig {
    /// Base URL of the interpretation service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token, where the backend requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds. Timeouts belong to the transport; the
    /// engine never retries on its own.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on the serialized snapshot size sent per request
    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: usize,
}

fn default_base_url() -> String {
    "http://localhost:8600".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_max_snapshot_bytes() -> usize {
    512 * 1024
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interpreter.timeout_secs, 60);
        assert!(config.interpreter.api_key.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }
}
