//! Core record storage trait.
//!
//! This module defines the [`RecordStorage`] trait, the operations a request
//! layer calls for every entity kind: create, read, list, update and delete.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{EntityKey, Record};

use super::entity::Entity;

/// Versioned CRUD over the nine entity kinds.
///
/// # Versioning
///
/// A created entity starts at version 1. Each successful update archives the
/// pre-update state into the kind's history table, tagged with the version it
/// held, then bumps the live version by exactly one. Reads never change the
/// version.
///
/// # Deletes
///
/// Deletes are hard deletes: the current row and all of its history rows are
/// removed together. An entity still referenced by current rows of another
/// kind cannot be deleted.
///
/// # Example
///
/// ```ignore
/// use ehr_persistence::core::RecordStorage;
/// use ehr_persistence::entities::{Patient, PatientPatch, Sex};
///
/// async fn example<S: RecordStorage>(storage: &S) -> StorageResult<()> {
///     let created = storage
///         .create(Patient::new("John", "Doe", Sex::Male, "PAT-001"))
///         .await?;
///     assert_eq!(created.version(), 1);
///
///     let patch = PatientPatch {
///         last_name: Some("Dow".to_string()),
///         ..Default::default()
///     };
///     let updated = storage.update::<Patient>(created.key().clone(), patch).await?;
///     assert_eq!(updated.version(), 2);
///
///     storage.delete::<Patient>(created.key().clone()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Creates a new entity at version 1.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - If required fields are missing or malformed
    /// * `StorageError::Integrity(MissingReference)` - If a reference points nowhere
    /// * `StorageError::Integrity(DuplicateKey)` - If a natural key is taken
    async fn create<E: Entity>(&self, data: E) -> StorageResult<Record<E>>;

    /// Reads the current state of an entity.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the entity doesn't exist
    async fn read<E: Entity>(&self, key: EntityKey) -> StorageResult<Record<E>>;

    /// Returns every current entity of a kind. Order is not meaningful.
    async fn list<E: Entity>(&self) -> StorageResult<Vec<Record<E>>>;

    /// Applies a partial update, archiving the previous state.
    ///
    /// Last writer wins: no expected version is checked.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the entity doesn't exist
    /// * `StorageError::Validation` - If the merged state is invalid
    /// * `StorageError::Integrity(MissingReference)` - If a reference points nowhere
    async fn update<E: Entity>(&self, key: EntityKey, patch: E::Patch) -> StorageResult<Record<E>>;

    /// Applies a partial update only if the live version equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Everything [`RecordStorage::update`] returns, plus
    /// `StorageError::Concurrency(VersionConflict)` on a version mismatch.
    async fn update_with_match<E: Entity>(
        &self,
        key: EntityKey,
        expected_version: i64,
        patch: E::Patch,
    ) -> StorageResult<Record<E>>;

    /// Deletes an entity together with all of its history rows.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the entity doesn't exist
    /// * `StorageError::Integrity(Referenced)` - If another entity still references it
    async fn delete<E: Entity>(&self, key: EntityKey) -> StorageResult<()>;
}
