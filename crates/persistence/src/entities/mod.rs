//! The nine entity kinds of the record store.
//!
//! Each kind pairs a business-field struct with a `*Patch` type for partial
//! updates and a static [`EntitySchema`] descriptor.
//!
//! ```text
//! Patient ─┬─ Composition ─┐
//!          │               ├─ LabTest ─┬─ LabAnalyteResult ─┐
//!          │   Specimen ───┘           ├─ CbcPanel ◄────────┤
//!          │                           └─ BloodTypePanel ◄──┘
//!          └─ BodyMeasurement
//!
//! ReferenceRange (keyed by LOINC code, standalone)
//! ```

mod blood_type_panel;
mod body_measurement;
mod cbc_panel;
mod composition;
mod lab_analyte_result;
mod patient;
mod reference_range;
mod specimen;
mod validate;

pub use blood_type_panel::{BLOOD_TYPE_PANEL_SCHEMA, BloodTypePanel, BloodTypePanelPatch};
pub use body_measurement::{BODY_MEASUREMENT_SCHEMA, BodyMeasurement, BodyMeasurementPatch};
pub use cbc_panel::{CBC_PANEL_SCHEMA, CbcPanel, CbcPanelPatch};
pub use composition::{COMPOSITION_SCHEMA, Composition, CompositionPatch};
pub use lab_analyte_result::{
    INTERPRETATION_HIGH, INTERPRETATION_LOW, INTERPRETATION_NORMAL, LAB_ANALYTE_RESULT_SCHEMA,
    LabAnalyteResult, LabAnalyteResultPatch, classify,
};
pub use lab_test::{LAB_TEST_SCHEMA, LabTest, LabTestPatch};
pub use patient::{PATIENT_SCHEMA, Patient, PatientPatch, Sex};
pub use reference_range::{REFERENCE_RANGE_SCHEMA, ReferenceRange, ReferenceRangePatch};
pub use specimen::{SPECIMEN_SCHEMA, Specimen, SpecimenPatch};

use crate::core::{Entity, EntityKind, EntitySchema};

impl EntityKind {
    /// Returns the storage descriptor of this kind.
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            EntityKind::Patient => Patient::SCHEMA,
            EntityKind::Composition => Composition::SCHEMA,
            EntityKind::Specimen => Specimen::SCHEMA,
            EntityKind::LabTest => LabTest::SCHEMA,
            EntityKind::LabAnalyteResult => LabAnalyteResult::SCHEMA,
            EntityKind::CbcPanel => CbcPanel::SCHEMA,
            EntityKind::BloodTypePanel => BloodTypePanel::SCHEMA,
            EntityKind::BodyMeasurement => BodyMeasurement::SCHEMA,
            EntityKind::ReferenceRange => ReferenceRange::SCHEMA,
        }
    }
}
