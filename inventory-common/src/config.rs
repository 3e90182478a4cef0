//! Bootstrap configuration
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments and their environment fallbacks (applied by the binary)
//! 2. TOML configuration file
//! 3. Built-in defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Configuration loaded from TOML
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Buffered change events per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "max_page_size")]
    pub max_page_size: u32,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            database_path: default_database_path(),
            event_capacity: default_event_capacity(),
            default_page_size: default_page_size(),
            max_page_size: max_page_size(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_event_capacity() -> usize {
    1000
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `<data dir>/inventory/inventory.db`, or `./inventory.db` when the platform
/// has no data directory
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("inventory").join("inventory.db"))
        .unwrap_or_else(|| PathBuf::from("inventory.db"))
}

/// `<config dir>/inventory/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("inventory").join("config.toml"))
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `explicit`, else the default location
    ///
    /// An explicit path must exist. A missing default file falls back to
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be > 0".to_string()));
        }
        if self.max_page_size == 0 {
            return Err(Error::Config("max_page_size must be > 0".to_string()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 9000
            database_path = "/tmp/inv.db"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/inv.db"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.max_page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_invalid_page_sizes_rejected() {
        let err = TomlConfig::from_toml_str("default_page_size = 500\nmax_page_size = 100")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            TomlConfig::from_toml_str("port = \"not a number\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(TomlConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 6001\nevent_capacity = 8\n").unwrap();

        let config = TomlConfig::load(Some(&path)).unwrap();
        assert_eq!(config.port, 6001);
        assert_eq!(config.event_capacity, 8);
    }
}
