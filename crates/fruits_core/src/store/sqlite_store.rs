//! SQLite unit of work: committed reads, staged writes, atomic commit.
//!
//! # Responsibility
//! - Fetch committed rows for any [`Entity`] with filter and sort options.
//! - Queue insert/update/delete and raw relationship writes until commit.
//! - Apply the queued writes in one transaction.
//!
//! # Invariants
//! - Staged writes are invisible to `fetch` until `commit` succeeds.
//! - `commit` is all-or-nothing; a failed commit also discards the queue.
//! - Fetch results end with `rowid ASC` for a stable tie-break.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult, Schema};
use crate::model::EntityId;
use crate::store::entity::Entity;
use crate::store::request::FetchRequest;
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::time::Instant;

/// One queued SQL statement and its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedWrite {
    entity: &'static str,
    id: EntityId,
    sql: String,
    params: Vec<Value>,
    require_row: bool,
}

impl StagedWrite {
    /// Queues `sql` on behalf of `entity`/`id` (used for error reporting).
    pub fn new(
        entity: &'static str,
        id: EntityId,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            entity,
            id,
            sql: sql.into(),
            params,
            require_row: false,
        }
    }

    /// Fails the whole commit when this statement changes zero rows.
    pub fn requiring_row(mut self) -> Self {
        self.require_row = true;
        self
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
}

/// Transactional store over one migrated SQLite connection.
pub struct SqliteStore {
    conn: Connection,
    schema: Schema,
    pending: Vec<StagedWrite>,
}

impl SqliteStore {
    /// Opens (and migrates) a database file for `schema`.
    pub fn open(path: impl AsRef<Path>, schema: Schema) -> DbResult<Self> {
        Ok(Self::from_migrated(open_db(path, schema)?, schema))
    }

    /// Opens (and migrates) an in-memory database for `schema`.
    pub fn open_in_memory(schema: Schema) -> DbResult<Self> {
        Ok(Self::from_migrated(open_db_in_memory(schema)?, schema))
    }

    fn from_migrated(conn: Connection, schema: Schema) -> Self {
        Self {
            conn,
            schema,
            pending: Vec::new(),
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Read access to the underlying connection for diagnostics.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns committed rows of `E` matching `request`.
    pub fn fetch<E: Entity>(&self, request: &FetchRequest) -> DbResult<Vec<E>> {
        self.ensure_schema::<E>()?;

        let mut sql = format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE);
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some((column, value)) = request.filter.as_ref() {
            let column = declared_column::<E>(*column)?;
            sql.push_str(&format!(" WHERE {column} = ?"));
            bind_values.push(value.clone());
        }

        sql.push_str(" ORDER BY ");
        for key in &request.sort {
            let column = declared_column::<E>(key.column)?;
            let direction = if key.ascending { "ASC" } else { "DESC" };
            sql.push_str(&format!("{column} {direction}, "));
        }
        sql.push_str("rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let mut entity = E::from_row(row)?;
            entity.hydrate(&self.conn)?;
            entities.push(entity);
        }

        debug!(
            "event=store_fetch module=store status=ok entity={} rows={}",
            E::NAME,
            entities.len()
        );
        Ok(entities)
    }

    /// Returns one committed entity by id.
    pub fn fetch_by_id<E: Entity>(&self, id: EntityId) -> DbResult<Option<E>> {
        let request = FetchRequest::all().filter_id("uuid", id);
        Ok(self.fetch::<E>(&request)?.into_iter().next())
    }

    /// Stages an insert of `entity`.
    pub fn insert<E: Entity>(&mut self, entity: &E) -> DbResult<()> {
        self.ensure_schema::<E>()?;
        let placeholders = (1..=E::COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        );
        self.stage(StagedWrite::new(
            E::NAME,
            entity.id(),
            sql,
            entity.column_values(),
        ));
        Ok(())
    }

    /// Stages a full-row update of `entity`; the row must still exist at commit.
    pub fn update<E: Entity>(&mut self, entity: &E) -> DbResult<()> {
        self.ensure_schema::<E>()?;
        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {assignments} WHERE uuid = ?1;", E::TABLE);
        self.stage(
            StagedWrite::new(E::NAME, entity.id(), sql, entity.column_values()).requiring_row(),
        );
        Ok(())
    }

    /// Stages removal of one row; relationship rows follow via foreign keys.
    pub fn delete<E: Entity>(&mut self, id: EntityId) -> DbResult<()> {
        self.ensure_schema::<E>()?;
        let sql = format!("DELETE FROM {} WHERE uuid = ?1;", E::TABLE);
        self.stage(
            StagedWrite::new(E::NAME, id, sql, vec![Value::Text(id.to_string())]).requiring_row(),
        );
        Ok(())
    }

    /// Stages a raw write, e.g. a relationship change.
    pub fn stage(&mut self, write: StagedWrite) {
        debug!(
            "event=store_stage module=store status=ok entity={} pending={}",
            write.entity,
            self.pending.len() + 1
        );
        self.pending.push(write);
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discards staged writes and returns how many were dropped.
    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            info!(
                "event=store_rollback module=store status=ok schema={} dropped={dropped}",
                self.schema
            );
        }
        dropped
    }

    /// Applies every staged write atomically and returns how many ran.
    ///
    /// # Errors
    /// - `DbError::Sqlite` for I/O or constraint violations.
    /// - `DbError::StaleWrite` when an update/delete target is gone.
    ///
    /// On error nothing is applied and the staged writes are discarded.
    pub fn commit(&mut self) -> DbResult<usize> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(0);
        }

        let started_at = Instant::now();
        let count = pending.len();
        match apply_all(&mut self.conn, &pending) {
            Ok(()) => {
                info!(
                    "event=store_commit module=store status=ok schema={} writes={count} duration_ms={}",
                    self.schema,
                    started_at.elapsed().as_millis()
                );
                Ok(count)
            }
            Err(err) => {
                error!(
                    "event=store_commit module=store status=error schema={} writes={count} duration_ms={} error={}",
                    self.schema,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn ensure_schema<E: Entity>(&self) -> DbResult<()> {
        if E::SCHEMA == self.schema {
            Ok(())
        } else {
            Err(DbError::WrongStore {
                entity: E::NAME,
                store: self.schema,
            })
        }
    }
}

fn apply_all(conn: &mut Connection, writes: &[StagedWrite]) -> DbResult<()> {
    let tx = conn.transaction()?;
    for write in writes {
        let changed = tx.execute(&write.sql, params_from_iter(write.params.iter()))?;
        if write.require_row && changed == 0 {
            return Err(DbError::StaleWrite {
                entity: write.entity,
                id: write.id.to_string(),
            });
        }
    }
    tx.commit()?;
    Ok(())
}

fn declared_column<E: Entity>(column: &'static str) -> DbResult<&'static str> {
    if E::COLUMNS.contains(&column) {
        Ok(column)
    } else {
        Err(DbError::UnknownColumn {
            table: E::TABLE,
            column,
        })
    }
}
