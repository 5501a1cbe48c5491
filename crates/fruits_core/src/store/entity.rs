//! Entity schema contract and row mappings for every stored model.
//!
//! # Responsibility
//! - Describe how each model maps onto its table.
//! - Hydrate relationship projections from join tables and foreign keys.
//!
//! # Invariants
//! - `COLUMNS[0]` is always `uuid`, and `column_values()` follows `COLUMNS`.
//! - Read paths reject malformed persisted ids instead of masking them.

use crate::db::{DbError, DbResult, Schema};
use crate::model::fruit::Fruit;
use crate::model::org::{Business, Department, Employee};
use crate::model::EntityId;
use crate::store::request::SortKey;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use uuid::Uuid;

/// Schema description for one stored model.
///
/// Implementors get generic fetch/insert/update/delete support from
/// [`SqliteStore`](crate::store::SqliteStore) and
/// [`EntityRepository`](crate::repo::entity_repo::EntityRepository).
pub trait Entity: Clone + Send + Sync + 'static {
    /// Lowercase label used in logs and errors.
    const NAME: &'static str;
    /// Logical store owning the table.
    const SCHEMA: Schema;
    const TABLE: &'static str;
    /// Persisted columns, `uuid` first.
    const COLUMNS: &'static [&'static str];
    /// Ordering used when the whole collection is loaded.
    const DEFAULT_SORT: &'static [SortKey] = &[];

    fn id(&self) -> EntityId;

    /// Bind values in `COLUMNS` order.
    fn column_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> DbResult<Self>;

    /// Fills relationship projections after `from_row`.
    fn hydrate(&mut self, _conn: &Connection) -> DbResult<()> {
        Ok(())
    }
}

impl Entity for Fruit {
    const NAME: &'static str = "fruit";
    const SCHEMA: Schema = Schema::Fruits;
    const TABLE: &'static str = "fruits";
    const COLUMNS: &'static [&'static str] = &["uuid", "name"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.name.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Self {
            id: parse_uuid(row, "fruits", "uuid")?,
            name: row.get("name")?,
        })
    }
}

impl Entity for Business {
    const NAME: &'static str = "business";
    const SCHEMA: Schema = Schema::Relationships;
    const TABLE: &'static str = "businesses";
    const COLUMNS: &'static [&'static str] = &["uuid", "name"];
    const DEFAULT_SORT: &'static [SortKey] = &[SortKey::asc("name")];

    fn id(&self) -> EntityId {
        self.id
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.name.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Self {
            id: parse_uuid(row, "businesses", "uuid")?,
            name: row.get("name")?,
            department_ids: Vec::new(),
            employee_ids: Vec::new(),
        })
    }

    fn hydrate(&mut self, conn: &Connection) -> DbResult<()> {
        self.department_ids = load_ids(
            conn,
            "SELECT department_uuid
             FROM business_departments
             WHERE business_uuid = ?1
             ORDER BY rowid ASC;",
            self.id,
        )?;
        self.employee_ids = load_ids(
            conn,
            "SELECT uuid
             FROM employees
             WHERE business_uuid = ?1
             ORDER BY rowid ASC;",
            self.id,
        )?;
        Ok(())
    }
}

impl Entity for Department {
    const NAME: &'static str = "department";
    const SCHEMA: Schema = Schema::Relationships;
    const TABLE: &'static str = "departments";
    const COLUMNS: &'static [&'static str] = &["uuid", "name"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.name.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Self {
            id: parse_uuid(row, "departments", "uuid")?,
            name: row.get("name")?,
            business_ids: Vec::new(),
            employee_ids: Vec::new(),
        })
    }

    fn hydrate(&mut self, conn: &Connection) -> DbResult<()> {
        self.business_ids = load_ids(
            conn,
            "SELECT business_uuid
             FROM business_departments
             WHERE department_uuid = ?1
             ORDER BY rowid ASC;",
            self.id,
        )?;
        self.employee_ids = load_ids(
            conn,
            "SELECT uuid
             FROM employees
             WHERE department_uuid = ?1
             ORDER BY rowid ASC;",
            self.id,
        )?;
        Ok(())
    }
}

impl Entity for Employee {
    const NAME: &'static str = "employee";
    const SCHEMA: Schema = Schema::Relationships;
    const TABLE: &'static str = "employees";
    const COLUMNS: &'static [&'static str] = &[
        "uuid",
        "name",
        "age",
        "date_joined",
        "business_uuid",
        "department_uuid",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.name.clone()),
            Value::Integer(self.age),
            Value::Integer(self.date_joined),
            optional_id_value(self.business_id),
            optional_id_value(self.department_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Self {
            id: parse_uuid(row, "employees", "uuid")?,
            name: row.get("name")?,
            age: row.get("age")?,
            date_joined: row.get("date_joined")?,
            business_id: parse_optional_uuid(row, "employees", "business_uuid")?,
            department_id: parse_optional_uuid(row, "employees", "department_uuid")?,
        })
    }
}

fn optional_id_value(id: Option<EntityId>) -> Value {
    match id {
        Some(id) => Value::Text(id.to_string()),
        None => Value::Null,
    }
}

fn parse_uuid(row: &Row<'_>, table: &str, column: &str) -> DbResult<EntityId> {
    let text: String = row.get(column)?;
    parse_uuid_text(&text, table, column)
}

fn parse_optional_uuid(row: &Row<'_>, table: &str, column: &str) -> DbResult<Option<EntityId>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => parse_uuid_text(&text, table, column).map(Some),
        None => Ok(None),
    }
}

fn parse_uuid_text(text: &str, table: &str, column: &str) -> DbResult<EntityId> {
    Uuid::parse_str(text).map_err(|_| {
        DbError::InvalidData(format!("invalid uuid value `{text}` in {table}.{column}"))
    })
}

fn load_ids(conn: &Connection, sql: &str, owner: EntityId) -> DbResult<Vec<EntityId>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid_text(&text, "relationship", "uuid")?);
    }
    Ok(ids)
}
