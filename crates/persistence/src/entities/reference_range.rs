//! Reference ranges keyed by LOINC code.

use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy};
use crate::error::{StorageResult, ValidationError};
use crate::types::{EntityKey, Row};

use super::lab_analyte_result::classify;
use super::validate;

/// Storage descriptor for [`ReferenceRange`].
pub const REFERENCE_RANGE_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::ReferenceRange,
    table: "reference_range",
    history_table: "reference_range_history",
    history_owner_column: "reference_range_loinc_code",
    key: KeyStrategy::Natural("loinc_code"),
    columns: &[
        Column::optional("low", ColumnType::Real),
        Column::optional("high", ColumnType::Real),
        Column::optional("unit", ColumnType::Text),
    ],
    references: &[],
};

/// Normal bounds for one analyte.
///
/// The LOINC code is the natural key. It is fixed at creation and cannot be
/// patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    /// LOINC code of the analyte.
    pub loinc_code: String,
    /// Lower bound.
    #[serde(default)]
    pub low: Option<f64>,
    /// Upper bound.
    #[serde(default)]
    pub high: Option<f64>,
    /// Unit of the bounds.
    #[serde(default)]
    pub unit: Option<String>,
}

impl ReferenceRange {
    /// Classifies `value` as "L", "H" or "N" against this range.
    pub fn classify(&self, value: f64) -> Option<&'static str> {
        classify(value, self.low, self.high)
    }
}

/// Partial update for [`ReferenceRange`]. `Some(None)` clears a bound.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceRangePatch {
    #[serde(default, deserialize_with = "validate::double_option")]
    pub low: Option<Option<f64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub high: Option<Option<f64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub unit: Option<Option<String>>,
}

impl Entity for ReferenceRange {
    type Patch = ReferenceRangePatch;

    const SCHEMA: &'static EntitySchema = &REFERENCE_RANGE_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = EntityKind::ReferenceRange;
        validate::loinc_code(kind, "loinc_code", &self.loinc_code)?;
        validate::optional_finite(kind, "low", self.low)?;
        validate::optional_finite(kind, "high", self.high)?;
        validate::ordered_bounds(kind, "low", self.low, self.high)?;
        Ok(())
    }

    // The key column travels separately from the business columns.
    fn to_row(&self) -> Row {
        Row::new()
            .with("low", self.low)
            .with("high", self.high)
            .with("unit", self.unit.clone())
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            loinc_code: row.text("loinc_code")?,
            low: row.opt_real("low")?,
            high: row.opt_real("high")?,
            unit: row.opt_text("unit")?,
        })
    }

    fn apply(&mut self, patch: ReferenceRangePatch) {
        if let Some(low) = patch.low {
            self.low = low;
        }
        if let Some(high) = patch.high {
            self.high = high;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
    }

    fn natural_key(&self) -> Option<EntityKey> {
        Some(EntityKey::Code(self.loinc_code.clone()))
    }
}
