//! Unit-of-work support for the SQLite backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params_from_iter};
use tracing::warn;

use crate::core::{
    ColumnType, EntitySchema, SURROGATE_KEY_COLUMN, UPDATED_AT_COLUMN, UnitOfWork,
    UnitOfWorkOptions, UnitOfWorkProvider, VERSION_COLUMN,
};
use crate::error::{BackendError, StorageError, StorageResult, TransactionError};
use crate::types::{EntityKey, FieldValue, Row, StoredHistoryRow, StoredRow};

use super::SqliteBackend;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn key_value(key: &EntityKey) -> Value {
    match key {
        EntityKey::Id(id) => Value::Integer(*id),
        EntityKey::Code(code) => Value::Text(code.clone()),
    }
}

fn field_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(v) => Value::Text(v.clone()),
        FieldValue::Integer(v) => Value::Integer(*v),
        FieldValue::Real(v) => Value::Real(*v),
        FieldValue::Timestamp(v) => Value::Text(v.to_rfc3339()),
    }
}

fn decode_key(value: Value) -> StorageResult<EntityKey> {
    match value {
        Value::Integer(id) => Ok(EntityKey::Id(id)),
        Value::Text(code) => Ok(EntityKey::Code(code)),
        other => Err(serialization_error(format!("invalid key value {:?}", other))),
    }
}

fn decode_timestamp(column: &str, text: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            serialization_error(format!(
                "column '{}': invalid timestamp '{}': {}",
                column, text, e
            ))
        })
}

fn decode_field(column: &str, ty: ColumnType, value: Value) -> StorageResult<FieldValue> {
    Ok(match (ty, value) {
        (_, Value::Null) => FieldValue::Null,
        (ColumnType::Timestamp, Value::Text(text)) => {
            FieldValue::Timestamp(decode_timestamp(column, &text)?)
        }
        (ColumnType::Real, Value::Integer(v)) => FieldValue::Real(v as f64),
        (_, Value::Text(v)) => FieldValue::Text(v),
        (_, Value::Integer(v)) => FieldValue::Integer(v),
        (_, Value::Real(v)) => FieldValue::Real(v),
        (_, Value::Blob(_)) => {
            return Err(serialization_error(format!(
                "column '{}': unexpected blob",
                column
            )));
        }
    })
}

/// Decodes the business columns from the remaining values, in schema order.
fn decode_row(
    schema: &EntitySchema,
    values: &mut std::vec::IntoIter<Value>,
) -> StorageResult<Row> {
    let mut row = Row::new();
    for column in schema.columns {
        let value = values
            .next()
            .ok_or_else(|| serialization_error(format!("column '{}' missing", column.name)))?;
        row.set(column.name, decode_field(column.name, column.ty, value)?);
    }
    Ok(row)
}

fn business_values(schema: &EntitySchema, row: &Row) -> Vec<Value> {
    schema
        .columns
        .iter()
        .map(|c| row.get(c.name).map(field_value).unwrap_or(Value::Null))
        .collect()
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_values(row: &rusqlite::Row<'_>, count: usize) -> rusqlite::Result<Vec<Value>> {
    (0..count).map(|i| row.get::<_, Value>(i)).collect()
}

/// A SQLite unit of work: one connection inside one transaction.
pub struct SqliteUnitOfWork {
    conn: PooledConnection<SqliteConnectionManager>,
    active: bool,
    read_only: bool,
}

impl std::fmt::Debug for SqliteUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteUnitOfWork")
            .field("active", &self.active)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl SqliteUnitOfWork {
    /// Starts a transaction on `conn`.
    ///
    /// Writers take the database write lock immediately; readers open a
    /// deferred transaction.
    fn begin(
        conn: PooledConnection<SqliteConnectionManager>,
        options: UnitOfWorkOptions,
    ) -> StorageResult<Self> {
        let statement = if options.read_only {
            "BEGIN DEFERRED"
        } else {
            "BEGIN IMMEDIATE"
        };
        conn.execute_batch(statement)?;

        Ok(Self {
            conn,
            active: true,
            read_only: options.read_only,
        })
    }

    fn ensure_active(&self) -> StorageResult<()> {
        if !self.active {
            return Err(StorageError::Transaction(TransactionError::InvalidTransaction));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        self.ensure_active()?;
        if self.read_only {
            return Err(StorageError::Transaction(TransactionError::ReadOnly));
        }
        Ok(())
    }

    fn insert_row(
        &self,
        schema: &EntitySchema,
        key: Option<&EntityKey>,
        row: &Row,
        version: i64,
    ) -> StorageResult<EntityKey> {
        self.ensure_writable()?;

        let mut columns: Vec<&str> = Vec::with_capacity(schema.columns.len() + 2);
        let mut values: Vec<Value> = Vec::with_capacity(schema.columns.len() + 2);
        match (schema.has_natural_key(), key) {
            (true, Some(key)) => {
                columns.push(schema.key_column());
                values.push(key_value(key));
            }
            (true, None) => {
                return Err(internal_error(format!(
                    "{} requires a caller-supplied key",
                    schema.kind
                )));
            }
            (false, Some(_)) => {
                return Err(internal_error(format!(
                    "{} keys are assigned by the database",
                    schema.kind
                )));
            }
            (false, None) => {}
        }
        columns.extend(schema.column_names());
        values.extend(business_values(schema, row));
        columns.push(VERSION_COLUMN);
        values.push(Value::Integer(version));

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders(values.len())
        );
        self.conn.execute(&sql, params_from_iter(values))?;

        Ok(match key {
            Some(key) => key.clone(),
            None => EntityKey::Id(self.conn.last_insert_rowid()),
        })
    }

    fn select_current_sql(schema: &EntitySchema) -> String {
        let columns: Vec<&str> = schema.column_names().collect();
        format!(
            "SELECT {}, {}, {} FROM {}",
            schema.key_column(),
            VERSION_COLUMN,
            columns.join(", "),
            schema.table
        )
    }

    fn decode_current(schema: &EntitySchema, values: Vec<Value>) -> StorageResult<StoredRow> {
        let mut values = values.into_iter();
        let key = decode_key(values.next().unwrap_or(Value::Null))?;
        let version = match values.next() {
            Some(Value::Integer(version)) => version,
            other => return Err(serialization_error(format!("invalid version {:?}", other))),
        };
        let row = decode_row(schema, &mut values)?;
        Ok(StoredRow { key, version, row })
    }

    fn fetch_row(&self, schema: &EntitySchema, key: &EntityKey) -> StorageResult<Option<StoredRow>> {
        self.ensure_active()?;
        let sql = format!(
            "{} WHERE {} = ?1",
            Self::select_current_sql(schema),
            schema.key_column()
        );
        let count = schema.columns.len() + 2;
        let values = self
            .conn
            .query_row(&sql, [key_value(key)], |row| read_values(row, count))
            .optional()?;
        values.map(|v| Self::decode_current(schema, v)).transpose()
    }

    fn scan_rows(&self, schema: &EntitySchema) -> StorageResult<Vec<StoredRow>> {
        self.ensure_active()?;
        let sql = format!(
            "{} ORDER BY {}",
            Self::select_current_sql(schema),
            schema.key_column()
        );
        let count = schema.columns.len() + 2;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| read_values(row, count))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|v| Self::decode_current(schema, v))
            .collect()
    }

    fn update_row(
        &self,
        schema: &EntitySchema,
        key: &EntityKey,
        row: &Row,
        version: i64,
    ) -> StorageResult<bool> {
        self.ensure_writable()?;
        let mut assignments: Vec<String> = schema
            .column_names()
            .enumerate()
            .map(|(i, name)| format!("{} = ?{}", name, i + 1))
            .collect();
        let version_index = schema.columns.len() + 1;
        assignments.push(format!("{} = ?{}", VERSION_COLUMN, version_index));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            schema.table,
            assignments.join(", "),
            schema.key_column(),
            version_index + 1
        );
        let mut values = business_values(schema, row);
        values.push(Value::Integer(version));
        values.push(key_value(key));

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }

    fn delete_row(&self, schema: &EntitySchema, key: &EntityKey) -> StorageResult<bool> {
        self.ensure_writable()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            schema.table,
            schema.key_column()
        );
        let changed = self.conn.execute(&sql, [key_value(key)])?;
        Ok(changed > 0)
    }

    fn count_rows(&self, schema: &EntitySchema, column: &str, key: &EntityKey) -> StorageResult<u64> {
        self.ensure_active()?;
        if schema.column(column).is_none() {
            return Err(internal_error(format!(
                "{} has no column '{}'",
                schema.table, column
            )));
        }
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", schema.table, column);
        let count: i64 = self.conn.query_row(&sql, [key_value(key)], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn insert_history(
        &self,
        schema: &EntitySchema,
        owner_key: &EntityKey,
        row: &Row,
        version: i64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.ensure_writable()?;
        let mut columns: Vec<&str> = vec![schema.history_owner_column];
        columns.extend(schema.column_names());
        columns.push(VERSION_COLUMN);
        columns.push(UPDATED_AT_COLUMN);

        let mut values = vec![key_value(owner_key)];
        values.extend(business_values(schema, row));
        values.push(Value::Integer(version));
        values.push(Value::Text(updated_at.to_rfc3339()));

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.history_table,
            columns.join(", "),
            placeholders(values.len())
        );
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn select_history(
        &self,
        schema: &EntitySchema,
        owner_key: Option<&EntityKey>,
    ) -> StorageResult<Vec<StoredHistoryRow>> {
        self.ensure_active()?;
        let columns: Vec<&str> = schema.column_names().collect();
        let mut sql = format!(
            "SELECT {}, {}, {}, {}, {} FROM {}",
            SURROGATE_KEY_COLUMN,
            schema.history_owner_column,
            VERSION_COLUMN,
            UPDATED_AT_COLUMN,
            columns.join(", "),
            schema.history_table
        );
        let params: Vec<Value> = match owner_key {
            Some(key) => {
                sql.push_str(&format!(
                    " WHERE {} = ?1 ORDER BY {}, {}",
                    schema.history_owner_column, VERSION_COLUMN, SURROGATE_KEY_COLUMN
                ));
                vec![key_value(key)]
            }
            None => {
                sql.push_str(&format!(" ORDER BY {}", SURROGATE_KEY_COLUMN));
                Vec::new()
            }
        };

        let count = schema.columns.len() + 4;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| read_values(row, count))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|values| {
                let mut values = values.into_iter();
                let history_id = match values.next() {
                    Some(Value::Integer(id)) => id,
                    other => {
                        return Err(serialization_error(format!(
                            "invalid history id {:?}",
                            other
                        )));
                    }
                };
                let owner_key = decode_key(values.next().unwrap_or(Value::Null))?;
                let version = match values.next() {
                    Some(Value::Integer(version)) => version,
                    other => {
                        return Err(serialization_error(format!("invalid version {:?}", other)));
                    }
                };
                let updated_at = match values.next() {
                    Some(Value::Text(text)) => decode_timestamp(UPDATED_AT_COLUMN, &text)?,
                    other => {
                        return Err(serialization_error(format!(
                            "invalid updated_at {:?}",
                            other
                        )));
                    }
                };
                let row = decode_row(schema, &mut values)?;
                Ok(StoredHistoryRow {
                    history_id,
                    owner_key,
                    version,
                    updated_at,
                    row,
                })
            })
            .collect()
    }

    fn delete_history(&self, schema: &EntitySchema, owner_key: &EntityKey) -> StorageResult<u64> {
        self.ensure_writable()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            schema.history_table, schema.history_owner_column
        );
        let removed = self.conn.execute(&sql, [key_value(owner_key)])?;
        Ok(removed as u64)
    }

    fn finish(&mut self, statement: &str) -> StorageResult<()> {
        self.ensure_active()?;
        let result = self.conn.execute_batch(statement);
        self.active = false;
        if result.is_err() {
            // A failed COMMIT can leave the transaction open on a pooled connection.
            let _ = self.conn.execute_batch("ROLLBACK");
        }
        result.map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("{} failed: {}", statement, e),
            })
        })
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn insert(
        &mut self,
        schema: &'static EntitySchema,
        key: Option<&EntityKey>,
        row: &Row,
        version: i64,
    ) -> StorageResult<EntityKey> {
        self.insert_row(schema, key, row, version)
    }

    async fn fetch(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
    ) -> StorageResult<Option<StoredRow>> {
        self.fetch_row(schema, key)
    }

    async fn scan(&mut self, schema: &'static EntitySchema) -> StorageResult<Vec<StoredRow>> {
        self.scan_rows(schema)
    }

    async fn update_in_place(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
        row: &Row,
        version: i64,
    ) -> StorageResult<bool> {
        self.update_row(schema, key, row, version)
    }

    async fn delete_by_key(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
    ) -> StorageResult<bool> {
        self.delete_row(schema, key)
    }

    async fn count_referencing(
        &mut self,
        schema: &'static EntitySchema,
        column: &'static str,
        key: &EntityKey,
    ) -> StorageResult<u64> {
        self.count_rows(schema, column, key)
    }

    async fn append_history(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
        row: &Row,
        version: i64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.insert_history(schema, owner_key, row, version, updated_at)
    }

    async fn history_for(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
    ) -> StorageResult<Vec<StoredHistoryRow>> {
        self.select_history(schema, Some(owner_key))
    }

    async fn history_all(
        &mut self,
        schema: &'static EntitySchema,
    ) -> StorageResult<Vec<StoredHistoryRow>> {
        self.select_history(schema, None)
    }

    async fn delete_history_for(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
    ) -> StorageResult<u64> {
        self.delete_history(schema, owner_key)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.finish("COMMIT")
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.finish("ROLLBACK")
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if self.active {
            warn!("unit of work dropped while active, rolling back");
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

#[async_trait]
impl UnitOfWorkProvider for SqliteBackend {
    type UnitOfWork = SqliteUnitOfWork;

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn begin(&self, options: UnitOfWorkOptions) -> StorageResult<Self::UnitOfWork> {
        let conn = self.get_connection()?;
        SqliteUnitOfWork::begin(conn, options)
    }
}
