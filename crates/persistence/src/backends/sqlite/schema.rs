//! SQLite schema generation.
//!
//! Tables are generated from the entity descriptors. For a surrogate-keyed
//! kind such as LabTest this produces:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS lab_test (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     composition_id INTEGER NOT NULL REFERENCES composition(id),
//!     specimen_id INTEGER NOT NULL REFERENCES specimen(id),
//!     loinc_code TEXT,
//!     description TEXT,
//!     version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1)
//! );
//!
//! CREATE TABLE IF NOT EXISTS lab_test_history (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     lab_test_id INTEGER NOT NULL REFERENCES lab_test(id),
//!     composition_id INTEGER NOT NULL,
//!     specimen_id INTEGER NOT NULL,
//!     loinc_code TEXT,
//!     description TEXT,
//!     version INTEGER NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```
//!
//! History tables keep no foreign keys on business columns: a snapshot may
//! name a parent that has since been deleted.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::core::{
    ColumnType, EntityKind, EntitySchema, SURROGATE_KEY_COLUMN, UPDATED_AT_COLUMN, VERSION_COLUMN,
};
use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

fn migration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::MigrationError { message })
}

/// Initialize the database schema.
///
/// Idempotent. Fails if the database was written by a newer layout.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(migration_error(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version == 0 {
        conn.execute_batch(&create_all_sql())
            .map_err(|e| migration_error(format!("Failed to create tables: {}", e)))?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "initialized sqlite schema");
    } else {
        debug!(version = current_version, "sqlite schema up to date");
    }

    Ok(())
}

/// Get the current schema version, or 0 for a fresh database.
pub(crate) fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
pub(crate) fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

/// SQL type for a column type. Timestamps are RFC 3339 text.
pub(crate) fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text | ColumnType::Timestamp => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::Real => "REAL",
    }
}

fn not_null(nullable: bool) -> &'static str {
    if nullable { "" } else { " NOT NULL" }
}

/// DDL for every current and history table, parents first.
pub(crate) fn create_all_sql() -> String {
    let mut sql = String::from("BEGIN;\n");
    for kind in EntityKind::ALL {
        let schema = kind.schema();
        sql.push_str(&create_current_table_sql(schema));
        sql.push_str(&create_history_table_sql(schema));
    }
    sql.push_str("COMMIT;\n");
    sql
}

/// DDL for a kind's current table.
pub(crate) fn create_current_table_sql(schema: &EntitySchema) -> String {
    let mut columns = Vec::with_capacity(schema.columns.len() + 2);

    if schema.has_natural_key() {
        columns.push(format!(
            "{} {} PRIMARY KEY NOT NULL",
            schema.key_column(),
            sql_type(schema.key_type())
        ));
    } else {
        columns.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", SURROGATE_KEY_COLUMN));
    }

    for column in schema.columns {
        let mut definition = format!(
            "{} {}{}",
            column.name,
            sql_type(column.ty),
            not_null(column.nullable)
        );
        if let Some(reference) = schema.references.iter().find(|r| r.column == column.name) {
            let target = reference.target.schema();
            definition.push_str(&format!(
                " REFERENCES {}({})",
                target.table,
                target.key_column()
            ));
        }
        columns.push(definition);
    }

    columns.push(format!(
        "{} INTEGER NOT NULL DEFAULT 1 CHECK ({} >= 1)",
        VERSION_COLUMN, VERSION_COLUMN
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
        schema.table,
        columns.join(",\n    ")
    )
}

/// DDL for a kind's history table and its owner index.
pub(crate) fn create_history_table_sql(schema: &EntitySchema) -> String {
    let mut columns = Vec::with_capacity(schema.columns.len() + 4);
    columns.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", SURROGATE_KEY_COLUMN));
    columns.push(format!(
        "{} {} NOT NULL REFERENCES {}({})",
        schema.history_owner_column,
        sql_type(schema.key_type()),
        schema.table,
        schema.key_column()
    ));
    for column in schema.columns {
        columns.push(format!(
            "{} {}{}",
            column.name,
            sql_type(column.ty),
            not_null(column.nullable)
        ));
    }
    columns.push(format!("{} INTEGER NOT NULL", VERSION_COLUMN));
    columns.push(format!("{} TEXT NOT NULL", UPDATED_AT_COLUMN));

    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {columns}\n);\n\
         CREATE INDEX IF NOT EXISTS idx_{table}_owner ON {table}({owner});\n",
        table = schema.history_table,
        columns = columns.join(",\n    "),
        owner = schema.history_owner_column,
    )
}
