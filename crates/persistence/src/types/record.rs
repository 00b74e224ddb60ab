//! Typed records returned by the versioned store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Entity;
use crate::error::StorageResult;

use super::{EntityKey, Row, StoredHistoryRow, StoredRow};

// Natural keys are stored in the key column, not among the business columns,
// so they are put back before decoding.
fn decode<E: Entity>(key: &EntityKey, row: &Row) -> StorageResult<E> {
    let key_column = E::SCHEMA.key_column();
    if E::SCHEMA.has_natural_key() && row.get(key_column).is_none() {
        E::from_row(&row.clone().with(key_column, key.clone()))
    } else {
        E::from_row(row)
    }
}

/// The current state of one entity.
///
/// Serializes with the entity's business fields flattened next to `key` and
/// `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "E: Serialize", deserialize = "E: Deserialize<'de>"))]
pub struct Record<E> {
    key: EntityKey,
    version: i64,
    #[serde(flatten)]
    data: E,
}

impl<E: Entity> Record<E> {
    /// Creates a record from its parts.
    pub fn new(key: EntityKey, version: i64, data: E) -> Self {
        Self { key, version, data }
    }

    pub(crate) fn from_stored(stored: StoredRow) -> StorageResult<Self> {
        Ok(Self {
            data: decode(&stored.key, &stored.row)?,
            key: stored.key,
            version: stored.version,
        })
    }

    /// Returns the entity key.
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Returns the live version.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns the business fields.
    pub fn data(&self) -> &E {
        &self.data
    }

    /// Consumes the record, returning the business fields.
    pub fn into_data(self) -> E {
        self.data
    }
}

/// An archived snapshot of a superseded entity state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "E: Serialize", deserialize = "E: Deserialize<'de>"))]
pub struct HistoryRecord<E> {
    history_id: i64,
    owner_key: EntityKey,
    version: i64,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    data: E,
}

impl<E: Entity> HistoryRecord<E> {
    pub(crate) fn from_stored(stored: StoredHistoryRow) -> StorageResult<Self> {
        Ok(Self {
            data: decode(&stored.owner_key, &stored.row)?,
            history_id: stored.history_id,
            owner_key: stored.owner_key,
            version: stored.version,
            updated_at: stored.updated_at,
        })
    }

    /// Returns the generated history row id.
    pub fn history_id(&self) -> i64 {
        self.history_id
    }

    /// Returns the key of the entity this snapshot belongs to.
    pub fn owner_key(&self) -> &EntityKey {
        &self.owner_key
    }

    /// Returns the version the entity held before the archiving update.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns when the snapshot was archived.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the archived business fields.
    pub fn data(&self) -> &E {
        &self.data
    }
}
