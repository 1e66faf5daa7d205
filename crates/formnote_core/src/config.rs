//! Runtime configuration for embedding the core.
//!
//! `CoreConfig` derives `Deserialize`, so hosts can load it from whatever
//! format they already use; [`CoreConfig::from_env`] covers the CLI.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "FORMNOTE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "FORMNOTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FORMNOTE_LOG_DIR";

/// Core settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` selects a private in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: LogLevel,
    /// Absolute directory for rotating logs; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    /// Reads `FORMNOTE_DB_PATH`, `FORMNOTE_LOG_LEVEL` and `FORMNOTE_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(raw) => raw.parse::<LogLevel>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LOG_LEVEL,
                value: raw,
            })?,
            None => LogLevel::default_for_build(),
        };

        let log_dir = match read(ENV_LOG_DIR).map(PathBuf::from) {
            Some(dir) if !dir.is_absolute() => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_DIR,
                    value: dir.display().to_string(),
                })
            }
            other => other,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level,
            log_dir,
        })
    }
}
