//! Configuration loading for freezer-api.
//!
//! Configuration is loaded from a TOML file (default: `freezer.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for freezer-api.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session defaults.
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// API behavior.
    #[serde(default)]
    pub api: ApiConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server (default: 0.0.0.0:9090).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Maximum pooled connections (default: 10).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Session defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Hold-off window in seconds for new sessions that don't set one (default: 60).
    #[serde(default = "default_hold_off")]
    pub default_hold_off: i64,
}

/// API behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Owner used when a request carries no `X-User-Id` header (default: "default").
    #[serde(default = "default_user")]
    pub default_user: String,
    /// Largest page returned by list endpoints (default: 100).
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("freezer.db")
}

fn default_max_connections() -> u32 {
    10
}

fn default_hold_off() -> i64 {
    freezer_types::DEFAULT_HOLD_OFF
}

fn default_user() -> String {
    "default".to_string()
}

fn default_max_page_size() -> u32 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_hold_off: default_hold_off(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_user: default_user(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
        assert_eq!(config.storage.database, PathBuf::from("freezer.db"));
        assert_eq!(config.sessions.default_hold_off, 60);
        assert_eq!(config.api.default_user, "default");
        assert_eq!(config.api.max_page_size, 100);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:5000"

[storage]
database = "/data/freezer.db"
max_connections = 4

[sessions]
default_hold_off = 120

[api]
default_user = "ops"
max_page_size = 25
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:5000");
        assert_eq!(config.storage.database, PathBuf::from("/data/freezer.db"));
        assert_eq!(config.storage.max_connections, 4);
        assert_eq!(config.sessions.default_hold_off, 120);
        assert_eq!(config.api.default_user, "ops");
        assert_eq!(config.api.max_page_size, 25);
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[sessions]\n").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
        assert_eq!(config.sessions.default_hold_off, 60);
        assert_eq!(config.storage.max_connections, 10);
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_address = \"127.0.0.1:7000\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:7000");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/freezer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind_address = 1").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
