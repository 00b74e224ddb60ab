//! Tests for partial updates.

use ehr_persistence::entities::{
    BloodTypePanel, BloodTypePanelPatch, BodyMeasurement, BodyMeasurementPatch, CbcPanel,
    CbcPanelPatch, LabAnalyteResult, LabAnalyteResultPatch, LabTest, LabTestPatch, Patient,
    PatientPatch, ReferenceRange, ReferenceRangePatch, Specimen,
};
use ehr_persistence::error::{IntegrityError, StorageError};
use ehr_persistence::types::payload;
use ehr_persistence::{EntityKey, ErrorCategory, HistoryStorage, RecordStorage};
use serde_json::json;

use crate::common::*;

// ============================================================================
// Update Tests - Merge Semantics
// ============================================================================

#[tokio::test]
async fn test_update_only_overwrites_present_fields() {
    let store = create_store();
    let created = store.create(john_doe()).await.unwrap();

    let patch = PatientPatch {
        last_name: Some("Smith".to_string()),
        ..Default::default()
    };
    let updated = store
        .update::<Patient>(created.key().clone(), patch)
        .await
        .unwrap();

    assert_eq!(updated.version(), 2);
    assert_eq!(updated.data().last_name, "Smith");
    assert_eq!(updated.data().first_name, "John");
    assert_eq!(updated.data().identifier, "PAT-001");

    let read = store.read::<Patient>(created.key().clone()).await.unwrap();
    assert_eq!(read, updated);
}

#[tokio::test]
async fn test_empty_patch_still_bumps_version() {
    let store = create_store();
    let created = store.create(blood_specimen()).await.unwrap();

    let updated = store
        .update::<Specimen>(created.key().clone(), Default::default())
        .await
        .unwrap();

    assert_eq!(updated.version(), 2);
    assert_eq!(updated.data(), created.data());

    let history = store.history::<Specimen>(created.key().clone()).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_json_null_clears_nullable_field() {
    let store = create_store();
    let created = store.create(blood_specimen()).await.unwrap();

    let patch = payload::parse_patch::<Specimen>(json!({"description": null})).unwrap();
    let updated = store
        .update::<Specimen>(created.key().clone(), patch)
        .await
        .unwrap();

    assert_eq!(updated.data().description, None);
    assert_eq!(updated.data().snomed_code.as_deref(), Some("122555007"));
}

#[tokio::test]
async fn test_update_body_measurement() {
    let store = create_store();
    let patient = store.create(john_doe()).await.unwrap();
    let weight = store
        .create(body_weight(id_of(&patient), 82.5))
        .await
        .unwrap();

    let patch = BodyMeasurementPatch {
        value: Some(81.9),
        record_time: Some(ts("2025-05-12T08:00:00Z")),
        ..Default::default()
    };
    let updated = store
        .update::<BodyMeasurement>(weight.key().clone(), patch)
        .await
        .unwrap();

    assert_eq!(updated.data().value, 81.9);
    assert_eq!(updated.data().record_time, ts("2025-05-12T08:00:00Z"));
    assert_eq!(updated.data().unit, "kg");
}

#[tokio::test]
async fn test_update_analyte_value_and_interpretation() {
    let store = create_store();
    let chain = seed_chain(&store).await;
    let result = store
        .create(hemoglobin(chain.lab_test_id, 14.2))
        .await
        .unwrap();

    let patch = LabAnalyteResultPatch {
        value: Some(10.4),
        interpretation: Some(Some("L".to_string())),
        ..Default::default()
    };
    let updated = store
        .update::<LabAnalyteResult>(result.key().clone(), patch)
        .await
        .unwrap();

    assert_eq!(updated.data().value, 10.4);
    assert_eq!(updated.data().interpretation.as_deref(), Some("L"));
    assert_eq!(updated.data().interpret(), Some("L"));
}

#[tokio::test]
async fn test_update_reference_range_keeps_key() {
    let store = create_store();
    store.create(cholesterol_range()).await.unwrap();
    let key = EntityKey::from("2093-3");

    let patch = ReferenceRangePatch {
        high: Some(Some(5.0)),
        ..Default::default()
    };
    let updated = store
        .update::<ReferenceRange>(key.clone(), patch)
        .await
        .unwrap();

    assert_eq!(updated.key(), &key);
    assert_eq!(updated.data().loinc_code, "2093-3");
    assert_eq!(updated.data().high, Some(5.0));
    assert_eq!(updated.data().low, None);

    let history = store.history::<ReferenceRange>(key).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].data().loinc_code, "2093-3");
    assert_eq!(history[0].data().high, Some(5.2));
}

#[tokio::test]
async fn test_update_panel_links_analytes() {
    let store = create_store();
    let chain = seed_chain(&store).await;
    let panel = store.create(cbc_panel(chain.lab_test_id)).await.unwrap();
    let hgb = store
        .create(hemoglobin(chain.lab_test_id, 14.2))
        .await
        .unwrap();

    let patch = CbcPanelPatch {
        hemoglobin_id: Some(Some(id_of(&hgb))),
        ..Default::default()
    };
    let updated = store
        .update::<CbcPanel>(panel.key().clone(), patch)
        .await
        .unwrap();

    assert_eq!(updated.data().hemoglobin_id, Some(id_of(&hgb)));
    assert_eq!(updated.data().platelet_id, None);
}

#[tokio::test]
async fn test_blood_type_panel_links_unitless_results() {
    let store = create_store();
    let chain = seed_chain(&store).await;
    let lab_test = store
        .create(blood_type_test(chain.composition_id, chain.specimen_id))
        .await
        .unwrap();
    let lab_test_id = id_of(&lab_test);
    let abo = payload::parse_create::<LabAnalyteResult>(json!({
        "lab_test_id": lab_test_id,
        "loinc_code": "882-1",
        "value": 0.0,
        "unit": "",
        "interpretation": "A"
    }))
    .unwrap();
    let abo = store.create(abo).await.unwrap();
    let rh = store.create(rh_factor(lab_test_id, true)).await.unwrap();
    let panel = store.create(blood_type_panel(lab_test_id)).await.unwrap();

    let patch = payload::parse_patch::<BloodTypePanel>(json!({
        "abo_id": id_of(&abo),
        "rh_id": id_of(&rh)
    }))
    .unwrap();
    let linked = store
        .update::<BloodTypePanel>(panel.key().clone(), patch)
        .await
        .unwrap();
    assert_eq!(linked.data().abo_id, Some(id_of(&abo)));
    assert_eq!(linked.data().rh_id, Some(id_of(&rh)));

    let patch = LabAnalyteResultPatch {
        interpretation: Some(Some("O".to_string())),
        ..Default::default()
    };
    let updated = store
        .update::<LabAnalyteResult>(abo.key().clone(), patch)
        .await
        .unwrap();
    assert_eq!(updated.version(), 2);
    assert_eq!(updated.data().unit, "");
    assert_eq!(updated.data().interpretation.as_deref(), Some("O"));

    let history = store
        .history::<LabAnalyteResult>(abo.key().clone())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].data().unit, "");
    assert_eq!(history[0].data().interpretation.as_deref(), Some("A"));

    let unlink = BloodTypePanelPatch {
        abo_id: Some(None),
        ..Default::default()
    };
    let unlinked = store
        .update::<BloodTypePanel>(panel.key().clone(), unlink)
        .await
        .unwrap();
    assert_eq!(unlinked.data().abo_id, None);
    assert_eq!(unlinked.data().rh_id, Some(id_of(&rh)));
}

// ============================================================================
// Update Tests - Failures
// ============================================================================

#[tokio::test]
async fn test_update_nonexistent() {
    let store = create_store();

    let err = store
        .update::<Patient>(EntityKey::Id(77), PatientPatch::default())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(store.history_all::<Patient>().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_to_missing_reference_changes_nothing() {
    let store = create_store();
    let chain = seed_chain(&store).await;
    let key = EntityKey::Id(chain.lab_test_id);

    let patch = LabTestPatch {
        specimen_id: Some(9_999),
        ..Default::default()
    };
    let err = store
        .update::<LabTest>(key.clone(), patch)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Integrity(IntegrityError::MissingReference { .. })
    ));
    let read = store.read::<LabTest>(key.clone()).await.unwrap();
    assert_eq!(read.version(), 1);
    assert_eq!(read.data().specimen_id, chain.specimen_id);
    assert!(store.history::<LabTest>(key).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_to_invalid_state_changes_nothing() {
    let store = create_store();
    let created = store.create(john_doe()).await.unwrap();

    let patch = PatientPatch {
        identifier: Some("   ".to_string()),
        ..Default::default()
    };
    let err = store
        .update::<Patient>(created.key().clone(), patch)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    let read = store.read::<Patient>(created.key().clone()).await.unwrap();
    assert_eq!(read, created);
    assert!(store
        .history::<Patient>(created.key().clone())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_patch_with_unknown_field_rejected() {
    let err = payload::parse_patch::<Patient>(json!({"middle_name": "Q"})).unwrap_err();

    assert!(err.to_string().contains("middle_name"));
}
