//! Tests for version counters and history snapshots.

use chrono::Utc;

use ehr_persistence::entities::{
    BloodTypePanel, BloodTypePanelPatch, LabAnalyteResult, LabAnalyteResultPatch, Patient,
    PatientPatch, Sex, Specimen, SpecimenPatch,
};
use ehr_persistence::{EntityKey, HistoryStorage, RecordStorage};

use crate::common::*;

fn rename(last_name: &str) -> PatientPatch {
    PatientPatch {
        last_name: Some(last_name.to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Version Counter
// ============================================================================

#[tokio::test]
async fn test_versions_increase_by_one() {
    let store = create_store();
    let created = store.create(john_doe()).await.unwrap();
    let key = created.key().clone();

    let mut expected = 1;
    for name in ["A", "B", "C", "D", "E"] {
        let updated = store.update::<Patient>(key.clone(), rename(name)).await.unwrap();
        expected += 1;
        assert_eq!(updated.version(), expected);
    }

    assert_eq!(store.read::<Patient>(key).await.unwrap().version(), 6);
}

#[tokio::test]
async fn test_versions_are_per_entity() {
    let store = create_store();
    let john = store.create(john_doe()).await.unwrap();
    let jane = store.create(jane_smith()).await.unwrap();

    store
        .update::<Patient>(john.key().clone(), rename("Dow"))
        .await
        .unwrap();
    store
        .update::<Patient>(john.key().clone(), rename("Dough"))
        .await
        .unwrap();
    let jane = store
        .update::<Patient>(jane.key().clone(), rename("Smythe"))
        .await
        .unwrap();

    assert_eq!(jane.version(), 2);
    let john = store.read::<Patient>(john.key().clone()).await.unwrap();
    assert_eq!(john.version(), 3);
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_one_snapshot_per_update() {
    let store = create_store();
    let created = store.create(blood_specimen()).await.unwrap();
    let key = created.key().clone();

    for n in 0..4 {
        let patch = SpecimenPatch {
            description: Some(Some(format!("aliquot {n}"))),
            ..Default::default()
        };
        store.update::<Specimen>(key.clone(), patch).await.unwrap();
    }

    let history = store.history::<Specimen>(key.clone()).await.unwrap();
    let versions: Vec<i64> = history.iter().map(|h| h.version()).collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
    assert!(history.iter().all(|h| h.owner_key() == &key));

    let current = store.read::<Specimen>(key).await.unwrap();
    assert_eq!(current.version(), 5);
    assert_eq!(current.data().description.as_deref(), Some("aliquot 3"));
}

#[tokio::test]
async fn test_snapshot_holds_pre_update_state() {
    let store = create_store();
    let chain = seed_chain(&store).await;
    let original = store
        .create(hemoglobin(chain.lab_test_id, 14.2))
        .await
        .unwrap();

    let patch = LabAnalyteResultPatch {
        value: Some(18.9),
        interpretation: Some(Some("H".to_string())),
        ..Default::default()
    };
    store
        .update::<LabAnalyteResult>(original.key().clone(), patch)
        .await
        .unwrap();

    let history = store
        .history::<LabAnalyteResult>(original.key().clone())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version(), 1);
    assert_eq!(history[0].data(), original.data());
}

#[tokio::test]
async fn test_snapshot_preserves_nulls() {
    let store = create_store();
    let chain = seed_chain(&store).await;
    let panel = store
        .create(blood_type_panel(chain.lab_test_id))
        .await
        .unwrap();
    let rh = store
        .create(rh_factor(chain.lab_test_id, true))
        .await
        .unwrap();

    let patch = BloodTypePanelPatch {
        rh_id: Some(Some(id_of(&rh))),
        ..Default::default()
    };
    store
        .update::<BloodTypePanel>(panel.key().clone(), patch)
        .await
        .unwrap();

    let history = store
        .history::<BloodTypePanel>(panel.key().clone())
        .await
        .unwrap();
    assert_eq!(history[0].data().rh_id, None);
    assert_eq!(history[0].data().abo_id, None);
    assert_eq!(history[0].data().lab_test_id, chain.lab_test_id);
}

#[tokio::test]
async fn test_snapshot_timestamps_ordered() {
    let store = create_store();
    let before = Utc::now();
    let created = store.create(john_doe()).await.unwrap();
    let key = created.key().clone();

    store.update::<Patient>(key.clone(), rename("B")).await.unwrap();
    store.update::<Patient>(key.clone(), rename("C")).await.unwrap();
    let after = Utc::now();

    let history = store.history::<Patient>(key).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].updated_at() >= before);
    assert!(history[0].updated_at() <= history[1].updated_at());
    assert!(history[1].updated_at() <= after);
    assert!(history[0].history_id() < history[1].history_id());
}

#[tokio::test]
async fn test_history_of_unknown_entity_is_empty() {
    let store = create_store();

    let history = store.history::<Patient>(EntityKey::Id(12)).await.unwrap();

    assert!(history.is_empty());
}

#[tokio::test]
async fn test_history_all_spans_entities() {
    let store = create_store();
    let john = store.create(john_doe()).await.unwrap();
    let jane = store.create(jane_smith()).await.unwrap();

    store
        .update::<Patient>(john.key().clone(), rename("Dow"))
        .await
        .unwrap();
    store
        .update::<Patient>(jane.key().clone(), rename("Smythe"))
        .await
        .unwrap();
    store
        .update::<Patient>(john.key().clone(), rename("Dough"))
        .await
        .unwrap();

    let all = store.history_all::<Patient>().await.unwrap();
    let owners: Vec<&EntityKey> = all.iter().map(|h| h.owner_key()).collect();
    assert_eq!(owners, vec![john.key(), jane.key(), john.key()]);
    assert!(store.history_all::<Specimen>().await.unwrap().is_empty());
}

// ============================================================================
// Patient Scenario
// ============================================================================

/// A patient created, corrected twice, then read back with its full trail.
#[tokio::test]
async fn test_patient_correction_trail() {
    let store = create_store();
    let created = store
        .create(Patient::new("Jon", "Doe", Sex::Male, "PAT-001"))
        .await
        .unwrap();
    let key = created.key().clone();

    let first_fix = PatientPatch {
        first_name: Some("John".to_string()),
        ..Default::default()
    };
    let v2 = store.update::<Patient>(key.clone(), first_fix).await.unwrap();
    assert_eq!(v2.version(), 2);

    let second_fix = PatientPatch {
        sex: Some(Sex::Female),
        first_name: Some("Joan".to_string()),
        ..Default::default()
    };
    let v3 = store.update::<Patient>(key.clone(), second_fix).await.unwrap();
    assert_eq!(v3.version(), 3);
    assert_eq!(v3.data(), &Patient::new("Joan", "Doe", Sex::Female, "PAT-001"));

    let history = store.history::<Patient>(key).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version(), 1);
    assert_eq!(history[0].data(), created.data());
    assert_eq!(history[1].version(), 2);
    assert_eq!(history[1].data(), v2.data());
}
