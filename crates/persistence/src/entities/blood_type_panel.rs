//! ABO/Rh blood typing panels.

use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy, Reference};
use crate::error::{StorageResult, ValidationError};
use crate::types::Row;

use super::validate;

/// Storage descriptor for [`BloodTypePanel`].
pub const BLOOD_TYPE_PANEL_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::BloodTypePanel,
    table: "blood_type_panel",
    history_table: "blood_type_panel_history",
    history_owner_column: "blood_type_panel_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("lab_test_id", ColumnType::Integer),
        Column::optional("abo_id", ColumnType::Integer),
        Column::optional("rh_id", ColumnType::Integer),
    ],
    references: &[
        Reference::new("lab_test_id", EntityKind::LabTest),
        Reference::new("abo_id", EntityKind::LabAnalyteResult),
        Reference::new("rh_id", EntityKind::LabAnalyteResult),
    ],
};

/// Groups the ABO group and Rh factor results under one lab test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodTypePanel {
    /// Owning lab test.
    pub lab_test_id: i64,
    /// ABO group result.
    #[serde(default)]
    pub abo_id: Option<i64>,
    /// Rh factor result.
    #[serde(default)]
    pub rh_id: Option<i64>,
}

/// Partial update for [`BloodTypePanel`]. `Some(None)` detaches a result.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BloodTypePanelPatch {
    pub lab_test_id: Option<i64>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub abo_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub rh_id: Option<Option<i64>>,
}

impl Entity for BloodTypePanel {
    type Patch = BloodTypePanelPatch;

    const SCHEMA: &'static EntitySchema = &BLOOD_TYPE_PANEL_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("lab_test_id", self.lab_test_id)
            .with("abo_id", self.abo_id)
            .with("rh_id", self.rh_id)
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            lab_test_id: row.integer("lab_test_id")?,
            abo_id: row.opt_integer("abo_id")?,
            rh_id: row.opt_integer("rh_id")?,
        })
    }

    fn apply(&mut self, patch: BloodTypePanelPatch) {
        if let Some(lab_test_id) = patch.lab_test_id {
            self.lab_test_id = lab_test_id;
        }
        if let Some(abo_id) = patch.abo_id {
            self.abo_id = abo_id;
        }
        if let Some(rh_id) = patch.rh_id {
            self.rh_id = rh_id;
        }
    }
}
