//! Shared handle to one store.
//!
//! # Responsibility
//! - Own the single [`SqliteStore`] of a logical store behind a lock.
//! - Run commits and reload reads on a blocking worker so callers are never
//!   blocked by SQLite I/O.
//!
//! # Invariants
//! - Handles are cheap clones of one shared store; there is no global
//!   instance, callers construct and pass it explicitly.
//! - A commit is never cancelled once started.

use crate::db::{DbError, DbResult, Schema};
use crate::store::sqlite_store::SqliteStore;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct StoreManager {
    store: Arc<Mutex<SqliteStore>>,
    schema: Schema,
}

impl StoreManager {
    pub fn new(store: SqliteStore) -> Self {
        let schema = store.schema();
        Self {
            store: Arc::new(Mutex::new(store)),
            schema,
        }
    }

    pub fn open(path: impl AsRef<Path>, schema: Schema) -> DbResult<Self> {
        Ok(Self::new(SqliteStore::open(path, schema)?))
    }

    pub fn open_in_memory(schema: Schema) -> DbResult<Self> {
        Ok(Self::new(SqliteStore::open_in_memory(schema)?))
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Runs `f` with exclusive access to the store on the current thread.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut SqliteStore) -> T) -> DbResult<T> {
        let mut guard = self.store.lock().map_err(|_| DbError::StoreUnavailable)?;
        Ok(f(&mut guard))
    }

    /// Runs `f` with exclusive access to the store on a blocking worker.
    pub async fn run_blocking<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut SqliteStore) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = store.lock().map_err(|_| DbError::StoreUnavailable)?;
            f(&mut guard)
        });
        match task.await {
            Ok(result) => result,
            Err(err) => Err(DbError::TaskFailed(err.to_string())),
        }
    }

    /// Flushes every staged write to durable storage.
    ///
    /// Resolves with the number of applied writes, or with the underlying
    /// cause when the transaction was rolled back.
    pub async fn commit(&self) -> DbResult<usize> {
        self.run_blocking(|store| store.commit()).await
    }
}
