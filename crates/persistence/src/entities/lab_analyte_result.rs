//! Discrete analyte results.

use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy, Reference};
use crate::error::{StorageResult, ValidationError};
use crate::types::Row;

use super::validate;

/// Storage descriptor for [`LabAnalyteResult`].
pub const LAB_ANALYTE_RESULT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::LabAnalyteResult,
    table: "lab_analyte_result",
    history_table: "lab_analyte_result_history",
    history_owner_column: "lab_analyte_result_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("lab_test_id", ColumnType::Integer),
        Column::required("loinc_code", ColumnType::Text),
        Column::required("value", ColumnType::Real),
        Column::required("unit", ColumnType::Text),
        Column::optional("reference_low", ColumnType::Real),
        Column::optional("reference_high", ColumnType::Real),
        Column::optional("interpretation", ColumnType::Text),
    ],
    references: &[Reference::new("lab_test_id", EntityKind::LabTest)],
};

/// HL7 interpretation flag: below the reference range.
pub const INTERPRETATION_LOW: &str = "L";
/// HL7 interpretation flag: above the reference range.
pub const INTERPRETATION_HIGH: &str = "H";
/// HL7 interpretation flag: within the reference range.
pub const INTERPRETATION_NORMAL: &str = "N";

/// Classifies a value against optional bounds.
///
/// Returns `None` when there are no bounds to compare against.
pub fn classify(value: f64, low: Option<f64>, high: Option<f64>) -> Option<&'static str> {
    match (low, high) {
        (None, None) => None,
        (Some(low), _) if value < low => Some(INTERPRETATION_LOW),
        (_, Some(high)) if value > high => Some(INTERPRETATION_HIGH),
        _ => Some(INTERPRETATION_NORMAL),
    }
}

/// One measured analyte of a lab test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabAnalyteResult {
    /// Owning lab test.
    pub lab_test_id: i64,
    /// LOINC code of the analyte.
    pub loinc_code: String,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`. Empty for coded results such as ABO group.
    pub unit: String,
    /// Lower bound of the reference range in effect.
    #[serde(default)]
    pub reference_low: Option<f64>,
    /// Upper bound of the reference range in effect.
    #[serde(default)]
    pub reference_high: Option<f64>,
    /// HL7 interpretation flag, e.g. "N", "H", "L".
    #[serde(default)]
    pub interpretation: Option<String>,
}

impl LabAnalyteResult {
    /// Derives the interpretation flag from `value` and the stored bounds.
    pub fn interpret(&self) -> Option<&'static str> {
        classify(self.value, self.reference_low, self.reference_high)
    }

    /// Sets `interpretation` from [`LabAnalyteResult::interpret`], builder style.
    pub fn with_derived_interpretation(mut self) -> Self {
        self.interpretation = self.interpret().map(str::to_string);
        self
    }
}

/// Partial update for [`LabAnalyteResult`]. `Some(None)` clears a nullable field.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabAnalyteResultPatch {
    pub lab_test_id: Option<i64>,
    pub loinc_code: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub reference_low: Option<Option<f64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub reference_high: Option<Option<f64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub interpretation: Option<Option<String>>,
}

impl Entity for LabAnalyteResult {
    type Patch = LabAnalyteResultPatch;

    const SCHEMA: &'static EntitySchema = &LAB_ANALYTE_RESULT_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = EntityKind::LabAnalyteResult;
        validate::loinc_code(kind, "loinc_code", &self.loinc_code)?;
        validate::require_finite(kind, "value", self.value)?;
        validate::optional_finite(kind, "reference_low", self.reference_low)?;
        validate::optional_finite(kind, "reference_high", self.reference_high)?;
        validate::ordered_bounds(kind, "reference_low", self.reference_low, self.reference_high)?;
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("lab_test_id", self.lab_test_id)
            .with("loinc_code", self.loinc_code.as_str())
            .with("value", self.value)
            .with("unit", self.unit.as_str())
            .with("reference_low", self.reference_low)
            .with("reference_high", self.reference_high)
            .with("interpretation", self.interpretation.clone())
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            lab_test_id: row.integer("lab_test_id")?,
            loinc_code: row.text("loinc_code")?,
            value: row.real("value")?,
            unit: row.text("unit")?,
            reference_low: row.opt_real("reference_low")?,
            reference_high: row.opt_real("reference_high")?,
            interpretation: row.opt_text("interpretation")?,
        })
    }

    fn apply(&mut self, patch: LabAnalyteResultPatch) {
        if let Some(lab_test_id) = patch.lab_test_id {
            self.lab_test_id = lab_test_id;
        }
        if let Some(loinc_code) = patch.loinc_code {
            self.loinc_code = loinc_code;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(reference_low) = patch.reference_low {
            self.reference_low = reference_low;
        }
        if let Some(reference_high) = patch.reference_high {
            self.reference_high = reference_high;
        }
        if let Some(interpretation) = patch.interpretation {
            self.interpretation = interpretation;
        }
    }
}
