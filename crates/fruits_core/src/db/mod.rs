//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for both logical stores.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Store identity is tracked via `PRAGMA application_id`; a fruits database
//!   is never opened as a relationships database or the other way round.
//! - Core code must not read/write application data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// One of the two independent logical stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Fruit-only store used by the fruit list screen.
    Fruits,
    /// Business/Department/Employee relationship graph.
    Relationships,
}

impl Schema {
    /// Stable label used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fruits => "fruits",
            Self::Relationships => "relationships",
        }
    }

    /// Value stamped into `PRAGMA application_id`.
    pub(crate) fn application_id(self) -> i32 {
        match self {
            Self::Fruits => 0x4652_5401,
            Self::Relationships => 0x4652_5402,
        }
    }

    pub(crate) fn from_application_id(value: i32) -> Option<Self> {
        [Self::Fruits, Self::Relationships]
            .into_iter()
            .find(|schema| schema.application_id() == value)
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Database file belongs to a different logical store.
    SchemaMismatch {
        expected: Schema,
        found: String,
    },
    /// Persisted row cannot be converted to a valid model.
    InvalidData(String),
    /// Fetch referenced a column the entity does not declare.
    UnknownColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A staged update/delete matched no row at commit time.
    StaleWrite {
        entity: &'static str,
        id: String,
    },
    /// Entity staged against a store of another schema.
    WrongStore {
        entity: &'static str,
        store: Schema,
    },
    /// Store lock was poisoned by a panicking holder.
    StoreUnavailable,
    /// Blocking worker running a store operation did not complete.
    TaskFailed(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch { expected, found } => write!(
                f,
                "database belongs to store `{found}`, expected `{expected}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::StaleWrite { entity, id } => {
                write!(f, "staged write for {entity} {id} matched no row")
            }
            Self::WrongStore { entity, store } => {
                write!(f, "{entity} cannot be stored in the `{store}` store")
            }
            Self::StoreUnavailable => write!(f, "store is unavailable after a panic"),
            Self::TaskFailed(message) => write!(f, "store task failed: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
