//! Storage configuration.

use std::path::Path;
use std::str::FromStr;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Environment variable that overrides the configured database path.
pub const DATABASE_ENV_VAR: &str = "LEAGUE_STATS_DB";

/// Database engine backing the store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// Embedded SQLite file (or `:memory:`).
    #[default]
    Sqlite,
}

/// Where and how the statistics store is opened.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File path of the database, or `:memory:`.
    database_path: String,

    /// Database engine.
    #[serde(default)]
    backend: Backend,
}

impl StorageConfig {
    /// Creates an SQLite configuration for `database_path`.
    #[instrument]
    pub fn new(database_path: String) -> Self {
        Self {
            database_path,
            backend: Backend::default(),
        }
    }

    /// Parses a storage location.
    ///
    /// Accepts `<backend>:///<path>` connection strings (`sqlite:///stats.db`)
    /// or a bare path, which selects SQLite.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the backend is unknown or the path is empty.
    #[instrument]
    pub fn parse_location(location: &str) -> Result<Self, ConfigError> {
        let (backend, path) = match location.split_once(":///") {
            Some((scheme, path)) => {
                let backend = Backend::from_str(scheme).map_err(|_| {
                    ConfigError::new(format!("Unsupported database backend: '{}'", scheme))
                })?;
                (backend, path)
            }
            None => (Backend::default(), location),
        };

        if path.is_empty() {
            return Err(ConfigError::new(format!(
                "Storage location '{}' has no database path",
                location
            )));
        }

        debug!(backend = %backend, path = %path, "Parsed storage location");
        Ok(Self {
            database_path: path.to_string(),
            backend,
        })
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(path = %config.database_path, backend = %config.backend, "Config loaded successfully");
        Ok(config)
    }

    /// Replaces the database path with [`DATABASE_ENV_VAR`] when it is set.
    #[instrument(skip(self))]
    pub fn with_env_override(self) -> Self {
        match std::env::var(DATABASE_ENV_VAR) {
            Ok(path) if !path.is_empty() => {
                debug!(path = %path, "Database path overridden from environment");
                self.with_database_path(path)
            }
            _ => self,
        }
    }

    /// Returns a copy pointing at a different database path.
    #[instrument(skip(self))]
    pub fn with_database_path(self, database_path: String) -> Self {
        Self {
            database_path,
            ..self
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
