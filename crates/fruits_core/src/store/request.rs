//! Fetch request shape: optional equality filter plus sort keys.

use crate::model::EntityId;
use rusqlite::types::Value;

/// One `ORDER BY` term over a declared entity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub ascending: bool,
}

impl SortKey {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// Query options for [`SqliteStore::fetch`](crate::store::SqliteStore::fetch).
///
/// Results always end with `rowid ASC`, so rows that compare equal on every
/// sort key keep store insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    pub filter: Option<(&'static str, Value)>,
    pub sort: Vec<SortKey>,
}

impl FetchRequest {
    /// Unfiltered request in insertion order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts rows to `column = value`.
    pub fn filter_eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter = Some((column, value.into()));
        self
    }

    /// Restricts rows to those whose `column` references `id`.
    pub fn filter_id(self, column: &'static str, id: EntityId) -> Self {
        self.filter_eq(column, id.to_string())
    }

    pub fn sorted_by(mut self, keys: &[SortKey]) -> Self {
        self.sort.extend_from_slice(keys);
        self
    }
}
