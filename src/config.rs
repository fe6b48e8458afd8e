//! Brickyard Configuration
//!
//! Configuration structures for the cluster metadata service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main Brickyard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrickyardConfig {
    /// Entry store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Entry store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the database file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name inside `data_dir`
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// How long a transaction waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Enable HTTP API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP API bind address
    #[serde(default = "default_api_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/brickyard")
}

fn default_db_file() -> String {
    "brickyard.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_api_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: default_db_file(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_api_address(),
            cors_enabled: false,
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

impl StoreConfig {
    /// Full path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl BrickyardConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: BrickyardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.store.data_dir.as_os_str().is_empty() {
            return Err(crate::Error::Config("store.data_dir cannot be empty".into()));
        }

        if self.store.db_file.is_empty() {
            return Err(crate::Error::Config("store.db_file cannot be empty".into()));
        }

        if self.api.enabled && self.api.bind_address.is_empty() {
            return Err(crate::Error::Config("api.bind_address cannot be empty".into()));
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(crate::Error::Config(format!(
                "logging.format must be one of {:?}, got '{}'",
                LOG_FORMATS, self.logging.format
            )));
        }

        Ok(())
    }

    /// Get the database file path
    pub fn db_path(&self) -> PathBuf {
        self.store.db_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[store]
data_dir = "/tmp/brickyard"
busy_timeout_ms = 250

[api]
bind_address = "127.0.0.1:9090"
cors_enabled = true

[logging]
level = "debug"
format = "json"
"#;

        let config = BrickyardConfig::from_str(toml).unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/tmp/brickyard/brickyard.db"));
        assert_eq!(config.store.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.api.bind_address, "127.0.0.1:9090");
        assert!(config.api.cors_enabled);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BrickyardConfig::from_str("").unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/brickyard/brickyard.db"));
        assert!(config.api.enabled);
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let err = BrickyardConfig::from_str("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = BrickyardConfig::from_str("[store\n").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
