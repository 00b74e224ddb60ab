//! Specimens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy};
use crate::error::{StorageResult, ValidationError};
use crate::types::Row;

use super::validate;

/// Storage descriptor for [`Specimen`].
pub const SPECIMEN_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Specimen,
    table: "specimen",
    history_table: "specimen_history",
    history_owner_column: "specimen_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("specimen_type", ColumnType::Text),
        Column::required("collection_time", ColumnType::Timestamp),
        Column::optional("snomed_code", ColumnType::Text),
        Column::optional("description", ColumnType::Text),
    ],
    references: &[],
};

/// A collected specimen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specimen {
    /// Specimen type, e.g. "Venous blood".
    pub specimen_type: String,
    /// When the specimen was collected.
    pub collection_time: DateTime<Utc>,
    /// SNOMED CT concept for the specimen type.
    #[serde(default)]
    pub snomed_code: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update for [`Specimen`].
///
/// Nullable fields use a double option: `None` leaves the field unchanged,
/// `Some(None)` clears it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecimenPatch {
    pub specimen_type: Option<String>,
    pub collection_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub snomed_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub description: Option<Option<String>>,
}

impl Entity for Specimen {
    type Patch = SpecimenPatch;

    const SCHEMA: &'static EntitySchema = &SPECIMEN_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = EntityKind::Specimen;
        validate::require_text(kind, "specimen_type", &self.specimen_type)?;
        if let Some(code) = &self.snomed_code {
            validate::snomed_code(kind, "snomed_code", code)?;
        }
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("specimen_type", self.specimen_type.as_str())
            .with("collection_time", self.collection_time)
            .with("snomed_code", self.snomed_code.clone())
            .with("description", self.description.clone())
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            specimen_type: row.text("specimen_type")?,
            collection_time: row.timestamp("collection_time")?,
            snomed_code: row.opt_text("snomed_code")?,
            description: row.opt_text("description")?,
        })
    }

    fn apply(&mut self, patch: SpecimenPatch) {
        if let Some(specimen_type) = patch.specimen_type {
            self.specimen_type = specimen_type;
        }
        if let Some(collection_time) = patch.collection_time {
            self.collection_time = collection_time;
        }
        if let Some(snomed_code) = patch.snomed_code {
            self.snomed_code = snomed_code;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }
}
