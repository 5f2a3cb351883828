//! Runtime configuration for store and logging bootstrap.
//!
//! # Responsibility
//! - Describe where the note database lives and how schema drift is handled.
//! - Resolve defaults from the process environment for app/CLI startup.
//!
//! # Invariants
//! - Resolution never fails; blank env values fall back to defaults.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "NOTEKEEPER_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "NOTEKEEPER_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "NOTEKEEPER_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "note_database.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "notekeeper-logs";

/// Backing location of the note store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    /// SQLite database file. Created on first open.
    File(PathBuf),
    /// Private in-memory database; every open is a fresh store.
    Memory,
}

/// Store bootstrap options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// Drop and recreate (then re-seed) when the on-disk schema cannot be
    /// migrated. When `false` the open fails instead.
    pub destructive_fallback: bool,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            destructive_fallback: true,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            destructive_fallback: true,
        }
    }

    pub fn with_destructive_fallback(mut self, enabled: bool) -> Self {
        self.destructive_fallback = enabled;
        self
    }

    /// Resolves the store file from `NOTEKEEPER_DB_PATH`, defaulting to a
    /// file in the system temp directory.
    pub fn from_env() -> Self {
        let path = env_value(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        Self::file(path)
    }
}

/// Logging bootstrap options consumed by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error` (case-insensitive).
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl LogConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Resolves `NOTEKEEPER_LOG_LEVEL` and `NOTEKEEPER_LOG_DIR`.
    pub fn from_env() -> Self {
        let level = env_value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = env_value(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));
        Self { level, log_dir }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}
