//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides. The API
//! token is never read from or written to the config file; it comes from
//! `FLUXGRID_TOKEN` or the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{ClientSettings, ConnectionParams, Scheme};

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "FLUXGRID_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Last-used connection details (everything except the token)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub scheme: Scheme,

    /// Host with optional port
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub database: String,

    /// Skip certificate validation for https connections
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl ConnectionConfig {
    /// Combine with a token into connection parameters
    pub fn with_token(&self, token: impl Into<String>) -> ConnectionParams {
        ConnectionParams::new(self.scheme, self.host.clone(), self.database.clone(), token)
            .insecure(self.insecure_skip_verify)
    }

    /// Host and database are both set
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.database.trim().is_empty()
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("fluxgrid/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl From<&ClientConfig> for ClientSettings {
    fn from(config: &ClientConfig) -> Self {
        ClientSettings {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// CSV export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Directory for exports written without an explicit path
    #[serde(default = "default_export_dir")]
    pub directory: String,
}

fn default_export_dir() -> String {
    ".".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::search_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Candidate config files, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./fluxgrid.toml")];
        if let Some(path) = Self::default_path() {
            paths.push(path);
        }
        paths
    }

    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fluxgrid").join("config.toml"))
    }

    /// Persist the configuration, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            error: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
            }
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        tracing::info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// API token from the environment, if set
    pub fn token_from_env() -> Option<String> {
        std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Connection overrides
        if let Ok(scheme) = std::env::var("FLUXGRID_SCHEME") {
            match scheme.parse() {
                Ok(s) => self.connection.scheme = s,
                Err(e) => tracing::warn!("Ignoring FLUXGRID_SCHEME: {}", e),
            }
        }
        if let Ok(host) = std::env::var("FLUXGRID_HOST") {
            self.connection.host = host;
        }
        if let Ok(database) = std::env::var("FLUXGRID_DATABASE") {
            self.connection.database = database;
        }
        if let Ok(insecure) = std::env::var("FLUXGRID_INSECURE") {
            self.connection.insecure_skip_verify = matches!(
                insecure.to_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        // Client overrides
        if let Ok(secs) = std::env::var("FLUXGRID_CONNECT_TIMEOUT") {
            if let Ok(s) = secs.parse() {
                self.client.connect_timeout_secs = s;
            }
        }
        if let Ok(secs) = std::env::var("FLUXGRID_READ_TIMEOUT") {
            if let Ok(s) = secs.parse() {
                self.client.read_timeout_secs = s;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("FLUXGRID_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FLUXGRID_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to serialize config: {error}")]
    Serialize { error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# fluxgrid Configuration
#
# Environment variables override these settings:
# - FLUXGRID_SCHEME
# - FLUXGRID_HOST
# - FLUXGRID_DATABASE
# - FLUXGRID_INSECURE
# - FLUXGRID_CONNECT_TIMEOUT
# - FLUXGRID_READ_TIMEOUT
# - FLUXGRID_LOG_LEVEL
# - FLUXGRID_LOG_FORMAT
#
# The API token is never stored here. Set FLUXGRID_TOKEN instead.

[connection]
# http or https
scheme = "http"

# Host with optional port
host = "localhost:8086"

# Database to query
database = ""

# Skip certificate and hostname validation (https only)
insecure_skip_verify = false

[client]
# Connection timeout in seconds
connect_timeout_secs = 10

# Read timeout in seconds
read_timeout_secs = 10

[export]
# Directory for CSV exports written without an explicit path
directory = "."

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/tmp/fluxgrid.log"
"#
    .to_string()
}
