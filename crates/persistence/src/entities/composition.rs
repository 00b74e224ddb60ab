//! Clinical compositions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy, Reference};
use crate::error::{StorageResult, ValidationError};
use crate::types::Row;

/// Storage descriptor for [`Composition`].
pub const COMPOSITION_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Composition,
    table: "composition",
    history_table: "composition_history",
    history_owner_column: "composition_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("patient_id", ColumnType::Integer),
        Column::required("start_time", ColumnType::Timestamp),
    ],
    references: &[Reference::new("patient_id", EntityKind::Patient)],
};

/// A clinical document grouping the lab work of one encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    /// Owning patient.
    pub patient_id: i64,
    /// When the encounter started.
    pub start_time: DateTime<Utc>,
}

/// Partial update for [`Composition`]. `None` leaves a field unchanged.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositionPatch {
    pub patient_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
}

impl Entity for Composition {
    type Patch = CompositionPatch;

    const SCHEMA: &'static EntitySchema = &COMPOSITION_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("patient_id", self.patient_id)
            .with("start_time", self.start_time)
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            patient_id: row.integer("patient_id")?,
            start_time: row.timestamp("start_time")?,
        })
    }

    fn apply(&mut self, patch: CompositionPatch) {
        if let Some(patient_id) = patch.patient_id {
            self.patient_id = patient_id;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
    }
}
