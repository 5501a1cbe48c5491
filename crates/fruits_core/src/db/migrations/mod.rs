//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations per logical store in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic within one schema.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A migrated database is stamped with its schema `application_id`.

use crate::db::{DbError, DbResult, Schema};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const FRUITS_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("fruits/0001_init.sql"),
}];

const RELATIONSHIPS_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("relationships/0001_init.sql"),
}];

fn migrations_for(schema: Schema) -> &'static [Migration] {
    match schema {
        Schema::Fruits => FRUITS_MIGRATIONS,
        Schema::Relationships => RELATIONSHIPS_MIGRATIONS,
    }
}

/// Returns the latest migration version known by this binary for `schema`.
pub fn latest_version(schema: Schema) -> u32 {
    migrations_for(schema)
        .last()
        .map_or(0, |migration| migration.version)
}

/// Applies all pending migrations of `schema` on the provided connection.
pub fn apply_migrations(conn: &mut Connection, schema: Schema) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    ensure_schema_identity(conn, schema, current_version)?;

    let latest = latest_version(schema);
    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations_for(schema) {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.execute_batch(&format!(
        "PRAGMA application_id = {};",
        schema.application_id()
    ))?;
    tx.commit()?;

    Ok(())
}

fn ensure_schema_identity(conn: &Connection, schema: Schema, current_version: u32) -> DbResult<()> {
    let application_id: i32 =
        conn.query_row("PRAGMA application_id;", [], |row| row.get(0))?;

    if application_id == schema.application_id() {
        return Ok(());
    }

    // Unstamped and unversioned means a brand new database.
    if application_id == 0 && current_version == 0 {
        return Ok(());
    }

    let found = match Schema::from_application_id(application_id) {
        Some(other) => other.label().to_string(),
        None => format!("application_id={application_id}"),
    };
    Err(DbError::SchemaMismatch {
        expected: schema,
        found,
    })
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
