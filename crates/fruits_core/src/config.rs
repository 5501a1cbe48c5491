//! Runtime settings resolved from the environment.
//!
//! # Responsibility
//! - Decide where the two databases and the log files live.
//! - Pick the log level for the current build mode.
//!
//! # Invariants
//! - Blank environment values count as unset.
//! - Without `FRUITS_DATA_DIR` both stores run in memory.

use crate::db::Schema;
use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "FRUITS_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "FRUITS_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "FRUITS_LOG_DIR";

const FRUITS_DB_FILE_NAME: &str = "fruits.sqlite3";
const RELATIONSHIPS_DB_FILE_NAME: &str = "relationships.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding both database files; `None` means in-memory stores.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads `FRUITS_DATA_DIR`, `FRUITS_LOG_LEVEL` and `FRUITS_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its
    /// raw value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            data_dir: non_blank(DATA_DIR_ENV).map(PathBuf::from),
            log_level: non_blank(LOG_LEVEL_ENV)
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: non_blank(LOG_DIR_ENV).map(PathBuf::from),
        }
    }

    /// Database file for `schema`, or `None` for an in-memory store.
    pub fn db_path(&self, schema: Schema) -> Option<PathBuf> {
        let file_name = match schema {
            Schema::Fruits => FRUITS_DB_FILE_NAME,
            Schema::Relationships => RELATIONSHIPS_DB_FILE_NAME,
        };
        self.data_dir.as_ref().map(|dir| dir.join(file_name))
    }
}
