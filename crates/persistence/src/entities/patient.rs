//! Patient demographics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Column, ColumnType, Entity, EntityKind, EntitySchema, KeyStrategy};
use crate::error::{BackendError, StorageError, StorageResult, ValidationError};
use crate::types::Row;

use super::validate;

/// Administrative sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Sex {
    /// Returns the stored code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("unknown sex code '{}'", other)),
        }
    }
}

/// Storage descriptor for [`Patient`].
pub const PATIENT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Patient,
    table: "patient",
    history_table: "patient_history",
    history_owner_column: "patient_id",
    key: KeyStrategy::Surrogate,
    columns: &[
        Column::required("first_name", ColumnType::Text),
        Column::required("last_name", ColumnType::Text),
        Column::required("sex", ColumnType::Text),
        Column::required("identifier", ColumnType::Text),
    ],
    references: &[],
};

/// A patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Administrative sex.
    pub sex: Sex,
    /// External identifier such as a hospital number.
    pub identifier: String,
}

impl Patient {
    /// Creates a patient.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        sex: Sex,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            sex,
            identifier: identifier.into(),
        }
    }
}

/// Partial update for [`Patient`]. `None` leaves a field unchanged.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub sex: Option<Sex>,
    pub identifier: Option<String>,
}

impl Entity for Patient {
    type Patch = PatientPatch;

    const SCHEMA: &'static EntitySchema = &PATIENT_SCHEMA;

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = EntityKind::Patient;
        validate::require_text(kind, "first_name", &self.first_name)?;
        validate::require_text(kind, "last_name", &self.last_name)?;
        validate::require_text(kind, "identifier", &self.identifier)?;
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("first_name", self.first_name.as_str())
            .with("last_name", self.last_name.as_str())
            .with("sex", self.sex.as_str())
            .with("identifier", self.identifier.as_str())
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        let sex = row.text("sex")?.parse::<Sex>().map_err(|message| {
            StorageError::Backend(BackendError::SerializationError { message })
        })?;
        Ok(Self {
            first_name: row.text("first_name")?,
            last_name: row.text("last_name")?,
            sex,
            identifier: row.text("identifier")?,
        })
    }

    fn apply(&mut self, patch: PatientPatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(sex) = patch.sex {
            self.sex = sex;
        }
        if let Some(identifier) = patch.identifier {
            self.identifier = identifier;
        }
    }
}
