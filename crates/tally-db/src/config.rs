//! # Ledger Configuration
//!
//! Where the ledger database lives and how the pool behaves.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DATABASE_PATH=/var/lib/tally/ledger.db                       │
//! │     TALLY_DB_MAX_CONNECTIONS=8                                         │
//! │     TALLY_DB_BUSY_TIMEOUT_SECS=10                                      │
//! │     TALLY_LOG=tally_db=debug                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ledger.toml (path given by the caller)                             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! [database]
//! path = "/var/lib/tally/ledger.db"
//! max_connections = 8
//! busy_timeout_secs = 10
//!
//! [log]
//! filter = "info,tally_db=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long writers queue for the database lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tally-ledger.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_run_migrations() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_secs: default_busy_timeout(),
            run_migrations: default_run_migrations(),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Ledger Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl LedgerConfig {
    /// Loads configuration: file (if given and present), then environment,
    /// then validation.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                info!(?path, "Loading ledger config from file");
                Self::from_file(path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `TALLY_*` overrides from a key lookup (the process
    /// environment in [`load`](Self::load)).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            self.database.max_connections = max
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?;
        }

        if let Some(secs) = lookup("TALLY_DB_BUSY_TIMEOUT_SECS") {
            self.database.busy_timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_DB_BUSY_TIMEOUT_SECS".to_string()))?;
        }

        if let Some(filter) = lookup("TALLY_LOG") {
            self.log.filter = filter;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("database.path".to_string()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue(
                "database.min_connections must not exceed max_connections".to_string(),
            ));
        }

        Ok(())
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
            .run_migrations(self.database.run_migrations)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.busy_timeout_secs, 5);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_parse_partial_file() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [database]
            path = "/var/lib/tally/ledger.db"
            busy_timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/var/lib/tally/ledger.db"));
        assert_eq!(config.database.busy_timeout_secs, 10);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_DATABASE_PATH", "/tmp/other.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "12"),
            ("TALLY_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.log.filter, "debug");

        let db = config.db_config();
        assert_eq!(db.max_connections, 12);
        assert_eq!(db.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = LedgerConfig::default();
        let err = config
            .apply_overrides(|k| (k == "TALLY_DB_BUSY_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = LedgerConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = LedgerConfig::load(Some(&path)).unwrap();
        assert!(config.database.max_connections >= 1);
    }
}
