//! Declarative entity descriptors.
//!
//! Every entity kind is described once by an [`EntitySchema`]: its current
//! table, its history table, how it is keyed, its business columns, and the
//! columns that reference other kinds. Backends generate their storage layout
//! and statements from these descriptors, and the versioned-update protocol
//! drives all nine kinds through the same code path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The nine entity kinds of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Patient demographics.
    Patient,
    /// A clinical composition (encounter document) for a patient.
    Composition,
    /// A collected specimen.
    Specimen,
    /// A lab test performed on a specimen within a composition.
    LabTest,
    /// A single discrete analyte result of a lab test.
    LabAnalyteResult,
    /// Complete blood count panel.
    #[serde(rename = "CBCPanel")]
    CbcPanel,
    /// ABO / Rh blood type panel.
    BloodTypePanel,
    /// A body measurement such as height or weight.
    BodyMeasurement,
    /// A reference range keyed by its LOINC code.
    ReferenceRange,
}

impl EntityKind {
    /// All kinds, parents before children.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Patient,
        EntityKind::Specimen,
        EntityKind::ReferenceRange,
        EntityKind::Composition,
        EntityKind::LabTest,
        EntityKind::LabAnalyteResult,
        EntityKind::CbcPanel,
        EntityKind::BloodTypePanel,
        EntityKind::BodyMeasurement,
    ];

    /// Returns the kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Patient => "Patient",
            EntityKind::Composition => "Composition",
            EntityKind::Specimen => "Specimen",
            EntityKind::LabTest => "LabTest",
            EntityKind::LabAnalyteResult => "LabAnalyteResult",
            EntityKind::CbcPanel => "CBCPanel",
            EntityKind::BloodTypePanel => "BloodTypePanel",
            EntityKind::BodyMeasurement => "BodyMeasurement",
            EntityKind::ReferenceRange => "ReferenceRange",
        }
    }

    /// Parses a kind name, accepting either the kind name or its table name.
    pub fn parse(s: &str) -> Option<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s) || kind.schema().table == s)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Real,
    /// UTC instant.
    Timestamp,
}

/// A business column of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name, shared by the current and history tables.
    pub name: &'static str,
    /// Storage type.
    pub ty: ColumnType,
    /// Whether the column accepts nulls.
    pub nullable: bool,
}

impl Column {
    /// A NOT NULL column.
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    /// A nullable column.
    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// A column whose value is the key of another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// The referencing column.
    pub column: &'static str,
    /// The referenced kind.
    pub target: EntityKind,
}

impl Reference {
    /// Creates a reference descriptor.
    pub const fn new(column: &'static str, target: EntityKind) -> Self {
        Self { column, target }
    }
}

/// How an entity is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Backend-assigned integer in a dedicated `id` column.
    Surrogate,
    /// A business column doubles as the key.
    Natural(&'static str),
}

/// Column holding a surrogate key.
pub const SURROGATE_KEY_COLUMN: &str = "id";

/// Column holding the version counter.
pub const VERSION_COLUMN: &str = "version";

/// History column holding the archive timestamp.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Describes the storage layout of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// The kind described.
    pub kind: EntityKind,
    /// Current-state table.
    pub table: &'static str,
    /// History table.
    pub history_table: &'static str,
    /// History column pointing back at the owning entity's key.
    pub history_owner_column: &'static str,
    /// Key strategy.
    pub key: KeyStrategy,
    /// Business columns, in storage order (the surrogate id and version are implicit).
    pub columns: &'static [Column],
    /// Columns that reference other kinds.
    pub references: &'static [Reference],
}

impl EntitySchema {
    /// Returns the name of the key column in the current table.
    pub fn key_column(&self) -> &'static str {
        match self.key {
            KeyStrategy::Surrogate => SURROGATE_KEY_COLUMN,
            KeyStrategy::Natural(column) => column,
        }
    }

    /// Returns the storage type of the key.
    pub fn key_type(&self) -> ColumnType {
        match self.key {
            KeyStrategy::Surrogate => ColumnType::Integer,
            KeyStrategy::Natural(column) => self
                .column(column)
                .map(|c| c.ty)
                .unwrap_or(ColumnType::Text),
        }
    }

    /// Looks up a business column by name.
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the business column names in storage order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Returns true when the key is a business column.
    pub fn has_natural_key(&self) -> bool {
        matches!(self.key, KeyStrategy::Natural(_))
    }

    /// Enumerates every (child schema, reference) pair that points at `kind`.
    pub fn referencing(
        kind: EntityKind,
    ) -> impl Iterator<Item = (&'static EntitySchema, &'static Reference)> {
        EntityKind::ALL.into_iter().flat_map(move |child| {
            let schema = child.schema();
            schema
                .references
                .iter()
                .filter(move |r| r.target == kind)
                .map(move |r| (schema, r))
        })
    }
}
