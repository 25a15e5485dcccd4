//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where logs and the document store live.
//! - Validate settings before any side effect happens.
//!
//! Missing keys fall back to defaults: build-mode log level, no file
//! logging, in-memory store.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::{self, default_log_level, normalize_level, normalize_log_dir, LoggingError};
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("db_path cannot be empty")]
    EmptyDbPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks the level name and that configured paths are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level)?;
        if let Some(dir) = &self.log_dir {
            normalize_log_dir(path_str(dir)?)?;
        }
        if let Some(db_path) = &self.db_path {
            if db_path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDbPath);
            }
        }
        Ok(())
    }

    /// Opens the configured store with migrations applied.
    pub fn open_store(&self) -> Result<Connection, ConfigError> {
        let conn = match &self.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Ok(conn)
    }

    /// Starts file logging when `log_dir` is set.
    ///
    /// Returns `false` when no directory is configured and nothing started.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        logging::init_logging(&self.log_level, path_str(dir)?)?;
        info!(
            "event=config_applied module=config status=ok persistent_store={}",
            self.db_path.is_some()
        );
        Ok(true)
    }
}

fn path_str(path: &Path) -> Result<&str, ConfigError> {
    path.to_str()
        .ok_or_else(|| ConfigError::NonUtf8Path(path.to_path_buf()))
}
