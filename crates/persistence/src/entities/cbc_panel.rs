//! Complete blood count panels.

use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy, Reference};
use crate::error::{StorageResult, ValidationError};
use crate::types::Row;

use super::validate;

/// Storage descriptor for [`CbcPanel`].
pub const CBC_PANEL_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::CbcPanel,
    table: "cbc_panel",
    history_table: "cbc_panel_history",
    history_owner_column: "cbc_panel_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("lab_test_id", ColumnType::Integer),
        Column::optional("hemoglobin_id", ColumnType::Integer),
        Column::optional("white_cell_id", ColumnType::Integer),
        Column::optional("platelet_id", ColumnType::Integer),
    ],
    references: &[
        Reference::new("lab_test_id", EntityKind::LabTest),
        Reference::new("hemoglobin_id", EntityKind::LabAnalyteResult),
        Reference::new("white_cell_id", EntityKind::LabAnalyteResult),
        Reference::new("platelet_id", EntityKind::LabAnalyteResult),
    ],
};

/// Groups the analyte results of a CBC under one lab test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CbcPanel {
    /// Owning lab test.
    pub lab_test_id: i64,
    /// Hemoglobin result.
    #[serde(default)]
    pub hemoglobin_id: Option<i64>,
    /// White cell count result.
    #[serde(default)]
    pub white_cell_id: Option<i64>,
    /// Platelet count result.
    #[serde(default)]
    pub platelet_id: Option<i64>,
}

/// Partial update for [`CbcPanel`]. `Some(None)` detaches a result.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CbcPanelPatch {
    pub lab_test_id: Option<i64>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub hemoglobin_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub white_cell_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "validate::double_option")]
    pub platelet_id: Option<Option<i64>>,
}

impl Entity for CbcPanel {
    type Patch = CbcPanelPatch;

    const SCHEMA: &'static EntitySchema = &CBC_PANEL_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("lab_test_id", self.lab_test_id)
            .with("hemoglobin_id", self.hemoglobin_id)
            .with("white_cell_id", self.white_cell_id)
            .with("platelet_id", self.platelet_id)
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Self {
            lab_test_id: row.integer("lab_test_id")?,
            hemoglobin_id: row.opt_integer("hemoglobin_id")?,
            white_cell_id: row.opt_integer("white_cell_id")?,
            platelet_id: row.opt_integer("platelet_id")?,
        })
    }

    fn apply(&mut self, patch: CbcPanelPatch) {
        if let Some(lab_test_id) = patch.lab_test_id {
            self.lab_test_id = lab_test_id;
        }
        if let Some(hemoglobin_id) = patch.hemoglobin_id {
            self.hemoglobin_id = hemoglobin_id;
        }
        if let Some(white_cell_id) = patch.white_cell_id {
            self.white_cell_id = white_cell_id;
        }
        if let Some(platelet_id) = patch.platelet_id {
            self.platelet_id = platelet_id;
        }
    }
}
