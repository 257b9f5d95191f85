//! # Configuration
//!
//! Settings for the database and the transaction engine.
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. Defaults (compiled in)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. TOML file: explicit path, or <config dir>/vend.toml                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Environment: VEND_DB_PATH, VEND_MAX_CONNECTIONS,                   │
//! │                  VEND_MAX_ATTEMPTS, VEND_OPERATION_TIMEOUT_MS          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. validate()                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! [database]
//! path = "/var/lib/vend/vend.db"
//! max_connections = 8
//!
//! [engine]
//! max_attempts = 5
//! operation_timeout_ms = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Config Error
// =============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// A value is out of its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Where the database lives and how many connections to open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before SQLite gives up.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "vend", "vend")
        .map(|dirs| dirs.data_dir().join("vend.db"))
        .unwrap_or_else(|| PathBuf::from("vend.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Retry and timeout bounds for engine operations.
///
/// ## Retry Timeline
/// ```text
/// attempt 1 ──conflict──► sleep ~10ms ──► attempt 2 ──conflict──► sleep ~20ms
///    ... up to max_attempts, each sleep capped at max_backoff_ms
///
/// The whole sequence is cut off at operation_timeout_ms.
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Attempts per operation before surfacing ConcurrencyConflict.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Upper bound on one engine call, retries included.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    10
}

fn default_max_backoff() -> u64 {
    200
}

fn default_operation_timeout() -> u64 {
    5_000
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            operation_timeout_ms: default_operation_timeout(),
        }
    }
}

impl EngineSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

// =============================================================================
// Vend Config
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

impl VendConfig {
    /// Loads configuration: defaults, then file, then environment.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.engine.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_attempts must be at least 1".into(),
            ));
        }

        if self.engine.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.operation_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.engine.initial_backoff_ms > self.engine.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "engine.initial_backoff_ms ({}) exceeds engine.max_backoff_ms ({})",
                self.engine.initial_backoff_ms, self.engine.max_backoff_ms
            )));
        }

        Ok(())
    }

    /// Builds the pool configuration from the database settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("VEND_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("VEND_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid VEND_MAX_CONNECTIONS"),
            }
        }

        if let Ok(attempts) = std::env::var("VEND_MAX_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.engine.max_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid VEND_MAX_ATTEMPTS"),
            }
        }

        if let Ok(timeout) = std::env::var("VEND_OPERATION_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.engine.operation_timeout_ms = ms,
                Err(_) => warn!(value = %timeout, "Ignoring invalid VEND_OPERATION_TIMEOUT_MS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vend", "vend")
            .map(|dirs| dirs.config_dir().join("vend.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VendConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.engine.max_attempts, 5);
        assert_eq!(config.engine.operation_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: VendConfig = toml::from_str(
            r#"
            [engine]
            max_attempts = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.max_attempts, 9);
        assert_eq!(config.engine.initial_backoff_ms, 10);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_validation_rejects_bad_bounds() {
        let mut config = VendConfig::default();
        config.engine.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = VendConfig::default();
        config.engine.operation_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = VendConfig::default();
        config.engine.initial_backoff_ms = 500;
        config.engine.max_backoff_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vend.toml");
        std::fs::write(
            &path,
            "[database]\npath = \"/tmp/custom.db\"\nmax_connections = 3\n",
        )
        .unwrap();

        let config = VendConfig::load(Some(path)).unwrap();
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.db_config().max_connections, 3);
    }

    #[test]
    fn test_invalid_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vend.toml");
        std::fs::write(&path, "[engine\nmax_attempts = ").unwrap();

        assert!(matches!(
            VendConfig::load(Some(path)),
            Err(ConfigError::LoadFailed(_))
        ));
    }
}
