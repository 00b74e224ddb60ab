//! Storage-neutral rows.
//!
//! Entities cross the storage boundary as a [`Row`]: an ordered list of
//! column names and [`FieldValue`]s matching the entity's
//! [`EntitySchema`](crate::core::EntitySchema). Typed accessors convert back,
//! failing with a serialization error when the stored value has the wrong
//! shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageError, StorageResult};

use super::EntityKey;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// SQL NULL.
    Null,
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Real(f64),
    /// UTC instant.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the value as an entity key, if it can be one.
    pub fn as_key(&self) -> Option<EntityKey> {
        match self {
            FieldValue::Integer(id) => Some(EntityKey::Id(*id)),
            FieldValue::Text(code) => Some(EntityKey::Code(code.clone())),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<EntityKey> for FieldValue {
    fn from(key: EntityKey) -> Self {
        match key {
            EntityKey::Id(id) => FieldValue::Integer(id),
            EntityKey::Code(code) => FieldValue::Text(code),
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

fn type_error(column: &str, expected: &str, found: &FieldValue) -> StorageError {
    StorageError::Backend(BackendError::SerializationError {
        message: format!("column '{}': expected {}, found {:?}", column, expected, found),
    })
}

/// An ordered set of column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<(String, FieldValue)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column value, builder style.
    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a column value, replacing any previous value.
    pub fn set(&mut self, column: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    /// Returns the raw value of a column.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterates over column values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, column: &str) -> StorageResult<&FieldValue> {
        self.get(column).ok_or_else(|| {
            StorageError::Backend(BackendError::SerializationError {
                message: format!("column '{}' missing from row", column),
            })
        })
    }

    /// Reads a NOT NULL text column.
    pub fn text(&self, column: &str) -> StorageResult<String> {
        match self.require(column)? {
            FieldValue::Text(v) => Ok(v.clone()),
            other => Err(type_error(column, "text", other)),
        }
    }

    /// Reads a nullable text column.
    pub fn opt_text(&self, column: &str) -> StorageResult<Option<String>> {
        match self.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(_) => self.text(column).map(Some),
        }
    }

    /// Reads a NOT NULL integer column.
    pub fn integer(&self, column: &str) -> StorageResult<i64> {
        match self.require(column)? {
            FieldValue::Integer(v) => Ok(*v),
            other => Err(type_error(column, "integer", other)),
        }
    }

    /// Reads a nullable integer column.
    pub fn opt_integer(&self, column: &str) -> StorageResult<Option<i64>> {
        match self.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(_) => self.integer(column).map(Some),
        }
    }

    /// Reads a NOT NULL float column. Integers are widened.
    pub fn real(&self, column: &str) -> StorageResult<f64> {
        match self.require(column)? {
            FieldValue::Real(v) => Ok(*v),
            FieldValue::Integer(v) => Ok(*v as f64),
            other => Err(type_error(column, "real", other)),
        }
    }

    /// Reads a nullable float column.
    pub fn opt_real(&self, column: &str) -> StorageResult<Option<f64>> {
        match self.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(_) => self.real(column).map(Some),
        }
    }

    /// Reads a NOT NULL timestamp column.
    pub fn timestamp(&self, column: &str) -> StorageResult<DateTime<Utc>> {
        match self.require(column)? {
            FieldValue::Timestamp(v) => Ok(*v),
            FieldValue::Text(v) => DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    StorageError::Backend(BackendError::SerializationError {
                        message: format!("column '{}': invalid timestamp '{}': {}", column, v, e),
                    })
                }),
            other => Err(type_error(column, "timestamp", other)),
        }
    }
}

/// A current-table row as returned by the storage primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    /// The row key.
    pub key: EntityKey,
    /// The live version.
    pub version: i64,
    /// Business columns.
    pub row: Row,
}

/// A history-table row as returned by the storage primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHistoryRow {
    /// Generated history row id.
    pub history_id: i64,
    /// Key of the entity the snapshot belongs to.
    pub owner_key: EntityKey,
    /// The version the entity held when the snapshot was taken.
    pub version: i64,
    /// When the snapshot was archived.
    pub updated_at: DateTime<Utc>,
    /// Business columns as they were before the update.
    pub row: Row,
}
