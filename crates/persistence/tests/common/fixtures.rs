//! Entity fixtures for persistence tests.
//!
//! Values follow a realistic lab workflow: one patient, one encounter, a
//! venous blood specimen, a CBC and a blood type test with their analyte
//! results.

use chrono::{DateTime, TimeZone, Utc};

use ehr_persistence::entities::{
    BloodTypePanel, BodyMeasurement, CbcPanel, Composition, LabAnalyteResult, LabTest, Patient,
    ReferenceRange, Sex, Specimen,
};

/// Parses an RFC 3339 timestamp.
pub fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// A fixed instant on the given day of April 2025.
pub fn april(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, day, hour, 0, 0).unwrap()
}

pub fn john_doe() -> Patient {
    Patient::new("John", "Doe", Sex::Male, "PAT-001")
}

pub fn jane_smith() -> Patient {
    Patient::new("Jane", "Smith", Sex::Female, "PAT-002")
}

pub fn composition(patient_id: i64) -> Composition {
    Composition {
        patient_id,
        start_time: ts("2025-04-28T08:00:00Z"),
    }
}

pub fn blood_specimen() -> Specimen {
    Specimen {
        specimen_type: "Venous blood".to_string(),
        collection_time: ts("2025-04-27T07:45:00Z"),
        snomed_code: Some("122555007".to_string()),
        description: Some("Venous blood specimen".to_string()),
    }
}

pub fn cbc_test(composition_id: i64, specimen_id: i64) -> LabTest {
    LabTest {
        composition_id,
        specimen_id,
        loinc_code: Some("57021-8".to_string()),
        description: Some("Complete Blood Count (CBC)".to_string()),
    }
}

pub fn blood_type_test(composition_id: i64, specimen_id: i64) -> LabTest {
    LabTest {
        composition_id,
        specimen_id,
        loinc_code: Some("882-1".to_string()),
        description: Some("ABO and Rh group".to_string()),
    }
}

fn analyte(
    lab_test_id: i64,
    loinc_code: &str,
    value: f64,
    unit: &str,
    low: Option<f64>,
    high: Option<f64>,
) -> LabAnalyteResult {
    LabAnalyteResult {
        lab_test_id,
        loinc_code: loinc_code.to_string(),
        value,
        unit: unit.to_string(),
        reference_low: low,
        reference_high: high,
        interpretation: None,
    }
    .with_derived_interpretation()
}

pub fn hemoglobin(lab_test_id: i64, value: f64) -> LabAnalyteResult {
    analyte(lab_test_id, "718-7", value, "g/dL", Some(12.0), Some(17.5))
}

pub fn white_cells(lab_test_id: i64, value: f64) -> LabAnalyteResult {
    analyte(lab_test_id, "6690-2", value, "10^9/L", Some(4.0), Some(10.0))
}

pub fn platelets(lab_test_id: i64, value: f64) -> LabAnalyteResult {
    analyte(lab_test_id, "777-3", value, "10^9/L", Some(150.0), Some(400.0))
}

/// ABO group coded numerically (1 = A, 2 = B, 3 = AB, 4 = O). Coded results carry no unit.
pub fn abo_group(lab_test_id: i64, group: f64) -> LabAnalyteResult {
    analyte(lab_test_id, "882-1", group, "", None, None)
}

/// Rh factor coded numerically (1 = positive, 0 = negative).
pub fn rh_factor(lab_test_id: i64, positive: bool) -> LabAnalyteResult {
    let value = if positive { 1.0 } else { 0.0 };
    analyte(lab_test_id, "10331-7", value, "", None, None)
}

pub fn cbc_panel(lab_test_id: i64) -> CbcPanel {
    CbcPanel {
        lab_test_id,
        hemoglobin_id: None,
        white_cell_id: None,
        platelet_id: None,
    }
}

pub fn blood_type_panel(lab_test_id: i64) -> BloodTypePanel {
    BloodTypePanel {
        lab_test_id,
        abo_id: None,
        rh_id: None,
    }
}

pub fn body_weight(patient_id: i64, kg: f64) -> BodyMeasurement {
    BodyMeasurement {
        patient_id,
        record_time: ts("2025-04-28T08:15:00Z"),
        value: kg,
        unit: "kg".to_string(),
        snomed_code: "27113001".to_string(),
    }
}

pub fn hemoglobin_range() -> ReferenceRange {
    ReferenceRange {
        loinc_code: "718-7".to_string(),
        low: Some(12.0),
        high: Some(17.5),
        unit: Some("g/dL".to_string()),
    }
}

pub fn cholesterol_range() -> ReferenceRange {
    ReferenceRange {
        loinc_code: "2093-3".to_string(),
        low: None,
        high: Some(5.2),
        unit: Some("mmol/L".to_string()),
    }
}
