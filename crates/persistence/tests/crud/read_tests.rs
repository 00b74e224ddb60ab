//! Tests for reads and listings.

use ehr_persistence::entities::{LabAnalyteResult, Patient, ReferenceRange, Specimen};
use ehr_persistence::error::{ResourceError, StorageError};
use ehr_persistence::{EntityKey, ErrorCategory, RecordStorage};

use crate::common::*;

#[tokio::test]
async fn test_read_returns_created_state() {
    let store = create_store();
    let created = store.create(blood_specimen()).await.unwrap();

    let read = store.read::<Specimen>(created.key().clone()).await.unwrap();

    assert_eq!(read, created);
}

#[tokio::test]
async fn test_read_does_not_change_version() {
    let store = create_store();
    let created = store.create(john_doe()).await.unwrap();

    for _ in 0..3 {
        let read = store.read::<Patient>(created.key().clone()).await.unwrap();
        assert_eq!(read.version(), 1);
    }
}

#[tokio::test]
async fn test_read_nonexistent() {
    let store = create_store();

    let err = store.read::<Patient>(EntityKey::Id(404)).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_read_reference_range_by_code() {
    let store = create_store();
    store.create(hemoglobin_range()).await.unwrap();
    store.create(cholesterol_range()).await.unwrap();

    let read = store
        .read::<ReferenceRange>(EntityKey::from("2093-3"))
        .await
        .unwrap();

    assert_eq!(read.data(), &cholesterol_range());
    assert_eq!(read.data().classify(6.0), Some("H"));
}

#[tokio::test]
async fn test_read_unknown_reference_range() {
    let store = create_store();

    let err = store
        .read::<ReferenceRange>(EntityKey::from("2345-7"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_empty_kind() {
    let store = create_store();

    let patients = store.list::<Patient>().await.unwrap();

    assert!(patients.is_empty());
}

#[tokio::test]
async fn test_list_returns_every_row_of_kind() {
    let store = create_store();
    let chain = seed_chain(&store).await;

    store.create(hemoglobin(chain.lab_test_id, 14.2)).await.unwrap();
    store.create(white_cells(chain.lab_test_id, 11.3)).await.unwrap();
    store.create(jane_smith()).await.unwrap();

    let results = store.list::<LabAnalyteResult>().await.unwrap();
    let mut codes: Vec<&str> = results
        .iter()
        .map(|r| r.data().loinc_code.as_str())
        .collect();
    codes.sort_unstable();

    assert_eq!(codes, vec!["6690-2", "718-7"]);
    assert!(results.iter().all(|r| r.version() == 1));
    assert_eq!(store.list::<Patient>().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_record_serializes_flat() {
    let store = create_store();
    let created = store.create(john_doe()).await.unwrap();

    let value = serde_json::to_value(&created).unwrap();

    assert_eq!(value["version"], 1);
    assert_eq!(value["first_name"], "John");
    assert_eq!(value["sex"], "male");
    assert!(value["key"].is_i64());
}
