//! Body measurements such as height and weight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy, Reference};
use crate::error::{StorageResult, ValidationError};
use crate::types::Row;

use super::validate;

/// Storage descriptor for [`BodyMeasurement`].
pub const BODY_MEASUREMENT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::BodyMeasurement,
    table: "body_measurement",
    history_table: "body_measurement_history",
    history_owner_column: "body_measurement_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("patient_id", ColumnType::Integer),
        Column::required("record_time", ColumnType::Timestamp),
        Column::required("value", ColumnType::Real),
        Column::required("unit", ColumnType::Text),
        Column::required("snomed_code", ColumnType::Text),
    ],
    references: &[Reference::new("patient_id", EntityKind::Patient)],
};

/// A single body measurement of a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurement {
    /// Measured patient.
    pub patient_id: i64,
    /// When the measurement was taken.
    pub record_time: DateTime<Utc>,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`, e.g. "kg".
    pub unit: String,
    /// SNOMED CT concept naming what was measured.
    pub snomed_code: String,
}

/// Partial update for [`BodyMeasurement`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BodyMeasurementPatch {
    pub patient_id: Option<i64>,
    pub record_time: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub snomed_code: Option<String>,
}

impl Entity for BodyMeasurement {
    type Patch = BodyMeasurementPatch;

    const SCHEMA: &'static EntitySchema = &BODY_MEASUREMENT_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = EntityKind::BodyMeasurement;
        validate::require_finite(kind, "value", self.value)?;
        validate::require_text(kind, "unit", &self.unit)?;
        validate::snomed_code(kind, "snomed_code", &self.snomed_code)?;
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("patient_id", self.patient_id)
            .with("record_time", self.record_time)
            .with("value", self.value)
            .with("unit", self.unit.as_str())
            .with("snomed_code", self.snomed_code.as_str())
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            patient_id: row.integer("patient_id")?,
            record_time: row.timestamp("record_time")?,
            value: row.real("value")?,
            unit: row.text("unit")?,
            snomed_code: row.text("snomed_code")?,
        })
    }

    fn apply(&mut self, patch: BodyMeasurementPatch) {
        if let Some(patient_id) = patch.patient_id {
            self.patient_id = patient_id;
        }
        if let Some(record_time) = patch.record_time {
            self.record_time = record_time;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(snomed_code) = patch.snomed_code {
            self.snomed_code = snomed_code;
        }
    }
}
