//! Configuration management for docsh
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments (applied by the `cli` module)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, DocshError, Result};
use crate::session::validate_database_name;

/// Environment variable overriding the connection URI
pub const ENV_URI: &str = "DOCSH_URI";
/// Environment variable overriding the startup database
pub const ENV_DATABASE: &str = "DOCSH_DATABASE";
/// Environment variable overriding the per-statement timeout
pub const ENV_OPERATION_TIMEOUT_MS: &str = "DOCSH_OPERATION_TIMEOUT_MS";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "DOCSH_LOG_LEVEL";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Display configuration
    #[serde(default)]
    pub display: DisplayConfig,

    /// History configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection URI used when none is given on the command line
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database selected at startup
    #[serde(default = "default_database")]
    pub default_database: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-statement backend timeout in milliseconds
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,

    /// Maximum pool size
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Display and output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Output format (shell, json, json-pretty)
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Enable colored output
    #[serde(default = "default_color_output")]
    pub color_output: bool,

    /// Indentation width for multi-line output
    #[serde(default = "default_indent")]
    pub indent: usize,
}

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Shell format
    ///
    /// Uses shell syntax with type wrappers:
    /// - ObjectId('...'), ISODate('...'), Long('...')
    /// - Multi-line nested documents and arrays
    /// - Colored output support
    Shell,

    /// Compact JSON format (single-line)
    ///
    /// Special types are simplified: ObjectIds and dates become strings.
    /// Example: `{"_id":"5099803df3f4948bd2f98391","x":1}`
    Json,

    /// Pretty-printed JSON format (multi-line)
    #[serde(rename = "json-pretty")]
    JsonPretty,
}

/// Command history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of history entries
    #[serde(default = "default_max_history_size")]
    pub max_size: usize,

    /// Path to history file
    #[serde(default = "default_history_file")]
    pub file_path: PathBuf,

    /// Enable history persistence
    #[serde(default = "default_persist_history")]
    pub persist: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    crate::session::DEFAULT_DATABASE.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_operation_timeout() -> u64 {
    30_000
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_app_name() -> String {
    "docsh".to_string()
}

fn default_format() -> OutputFormat {
    OutputFormat::Shell
}

fn default_color_output() -> bool {
    true
}

fn default_indent() -> usize {
    2
}

fn default_max_history_size() -> usize {
    1000
}

fn default_history_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docsh_history")
}

fn default_persist_history() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    false
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            default_database: default_database(),
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_ms: default_operation_timeout(),
            max_pool_size: default_max_pool_size(),
            app_name: default_app_name(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color_output: default_color_output(),
            indent: default_indent(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_history_size(),
            file_path: default_history_file(),
            persist: default_persist_history(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DocshError::Config(ConfigError::FileNotFound(path.display().to_string()))
            }
            _ => DocshError::Io(e),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DocshError::Config(ConfigError::InvalidFormat(e.to_string())))
    }

    /// Load configuration from file and environment with proper precedence
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and defaults otherwise.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file, if any
    ///
    /// # Returns
    /// * `Result<Config>` - Merged and validated configuration or error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    ///
    /// # Arguments
    /// * `lookup` - Environment accessor, `std::env::var` in production
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(uri) = lookup(ENV_URI) {
            self.connection.uri = uri;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.connection.default_database = database;
        }
        if let Some(timeout) = lookup(ENV_OPERATION_TIMEOUT_MS) {
            self.connection.operation_timeout_ms =
                timeout.trim().parse().map_err(|_| invalid(ENV_OPERATION_TIMEOUT_MS, &timeout))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level.parse()?;
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docsh")
            .join("config.toml")
    }

    /// Serialize the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DocshError::Config(ConfigError::Generic(e.to_string())))
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.connection.connect_timeout_secs == 0 {
            return Err(invalid("connection.connect_timeout_secs", "0"));
        }
        if self.connection.operation_timeout_ms == 0 {
            return Err(invalid("connection.operation_timeout_ms", "0"));
        }
        if self.history.max_size == 0 {
            return Err(invalid("history.max_size", "0"));
        }
        if validate_database_name(&self.connection.default_database).is_err() {
            return Err(invalid(
                "connection.default_database",
                &self.connection.default_database,
            ));
        }
        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs)
    }

    /// Get per-statement backend timeout as Duration
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.operation_timeout_ms)
    }
}

fn invalid(field: &str, value: &str) -> DocshError {
    DocshError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = DocshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(invalid("logging.level", s)),
        }
    }
}

impl OutputFormat {
    /// Check if format requires pretty printing
    pub fn is_pretty(&self) -> bool {
        matches!(self, OutputFormat::JsonPretty)
    }

    /// Check if format is JSON-based
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Shell => "shell",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = DocshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "shell" => Ok(OutputFormat::Shell),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(invalid("display.format", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.uri, "mongodb://localhost:27017");
        assert_eq!(config.connection.default_database, "test");
        assert_eq!(config.display.format, OutputFormat::Shell);
        assert!(config.display.color_output);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_format_checks() {
        assert!(OutputFormat::JsonPretty.is_pretty());
        assert!(OutputFormat::JsonPretty.is_json());
        assert!(!OutputFormat::Json.is_pretty());
        assert!(!OutputFormat::Shell.is_json());
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_timeouts() {
        let config = Config::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.operation_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [connection]
            operation_timeout_ms = 500

            [display]
            format = "json-pretty"
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.operation_timeout_ms, 500);
        assert_eq!(config.connection.max_pool_size, 10);
        assert_eq!(config.display.format, OutputFormat::JsonPretty);
        assert_eq!(config.history.max_size, 1000);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[connection\nuri = 1").unwrap_err();
        assert!(matches!(err, DocshError::Config(ConfigError::InvalidFormat(_))));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/docsh/config.toml").unwrap_err();
        assert!(matches!(err, DocshError::Config(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(|key| match key {
                ENV_URI => Some("mongodb://db.example:27018".to_string()),
                ENV_DATABASE => Some("reporting".to_string()),
                ENV_OPERATION_TIMEOUT_MS => Some("1500".to_string()),
                ENV_LOG_LEVEL => Some("DEBUG".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.connection.uri, "mongodb://db.example:27018");
        assert_eq!(config.connection.default_database, "reporting");
        assert_eq!(config.operation_timeout(), Duration::from_millis(1500));
        assert_eq!(config.logging.level, LogLevel::Debug);

        let err = config
            .apply_env(|key| (key == ENV_OPERATION_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, DocshError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.connection.operation_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.history.max_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.default_database = "my.db".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("format = \"shell\""));
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
