//! Store construction and seeding helpers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ehr_persistence::backends::sqlite::{SqliteBackend, SqliteUnitOfWork};
use ehr_persistence::core::{
    EntitySchema, RecordStorage, UnitOfWork, UnitOfWorkOptions, UnitOfWorkProvider,
};
use ehr_persistence::error::{BackendError, StorageError, StorageResult};
use ehr_persistence::types::{EntityKey, Row, StoredHistoryRow, StoredRow};
use ehr_persistence::{Entity, Record, VersionedStore};

use super::fixtures;

pub type SqliteStore = VersionedStore<SqliteBackend>;

/// Creates a store over a fresh in-memory database.
pub fn create_store() -> SqliteStore {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    VersionedStore::new(backend)
}

/// Returns the surrogate id of a record.
pub fn id_of<E>(record: &Record<E>) -> i64
where
    E: Entity,
{
    record.key().as_id().expect("surrogate key")
}

/// Keys of a seeded patient -> composition -> lab test chain.
#[derive(Debug, Clone)]
pub struct SeededChain {
    pub patient_id: i64,
    pub composition_id: i64,
    pub specimen_id: i64,
    pub lab_test_id: i64,
}

/// Creates a patient, composition, specimen and CBC lab test.
pub async fn seed_chain<S: RecordStorage>(store: &S) -> SeededChain {
    let patient = store.create(fixtures::john_doe()).await.unwrap();
    let patient_id = id_of(&patient);
    let composition = store
        .create(fixtures::composition(patient_id))
        .await
        .unwrap();
    let specimen = store.create(fixtures::blood_specimen()).await.unwrap();
    let composition_id = id_of(&composition);
    let specimen_id = id_of(&specimen);
    let lab_test = store
        .create(fixtures::cbc_test(composition_id, specimen_id))
        .await
        .unwrap();

    SeededChain {
        patient_id,
        composition_id,
        specimen_id,
        lab_test_id: id_of(&lab_test),
    }
}

/// Which primitive a [`FailingProvider`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `update_in_place` fails without writing.
    UpdateInPlace,
    /// `delete_by_key` deletes the row, then reports an error.
    DeleteByKey,
}

/// A provider whose units of work fail at one injected point.
///
/// Everything else is delegated to a real SQLite unit of work, so a failing
/// update has already appended its history snapshot, and a failing delete has
/// already purged history, when the error surfaces.
#[derive(Debug, Clone)]
pub struct FailingProvider {
    inner: Arc<SqliteBackend>,
    point: FailurePoint,
}

impl FailingProvider {
    /// Fails every in-place update.
    pub fn new(inner: Arc<SqliteBackend>) -> Self {
        Self {
            inner,
            point: FailurePoint::UpdateInPlace,
        }
    }

    /// Fails every delete of a current row, after the row is gone.
    pub fn failing_deletes(inner: Arc<SqliteBackend>) -> Self {
        Self {
            inner,
            point: FailurePoint::DeleteByKey,
        }
    }
}

fn injected(operation: &str) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "failing-sqlite".to_string(),
        message: format!("injected {operation} failure"),
        source: None,
    })
}

#[async_trait]
impl UnitOfWorkProvider for FailingProvider {
    type UnitOfWork = FailingUnitOfWork;

    fn backend_name(&self) -> &'static str {
        "failing-sqlite"
    }

    async fn begin(&self, options: UnitOfWorkOptions) -> StorageResult<FailingUnitOfWork> {
        Ok(FailingUnitOfWork {
            inner: self.inner.begin(options).await?,
            point: self.point,
        })
    }
}

pub struct FailingUnitOfWork {
    inner: SqliteUnitOfWork,
    point: FailurePoint,
}

#[async_trait]
impl UnitOfWork for FailingUnitOfWork {
    async fn insert(
        &mut self,
        schema: &'static EntitySchema,
        key: Option<&EntityKey>,
        row: &Row,
        version: i64,
    ) -> StorageResult<EntityKey> {
        self.inner.insert(schema, key, row, version).await
    }

    async fn fetch(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
    ) -> StorageResult<Option<StoredRow>> {
        self.inner.fetch(schema, key).await
    }

    async fn scan(&mut self, schema: &'static EntitySchema) -> StorageResult<Vec<StoredRow>> {
        self.inner.scan(schema).await
    }

    async fn update_in_place(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
        row: &Row,
        version: i64,
    ) -> StorageResult<bool> {
        if self.point == FailurePoint::UpdateInPlace {
            return Err(injected("update"));
        }
        self.inner.update_in_place(schema, key, row, version).await
    }

    async fn delete_by_key(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
    ) -> StorageResult<bool> {
        let deleted = self.inner.delete_by_key(schema, key).await?;
        if self.point == FailurePoint::DeleteByKey {
            return Err(injected("delete"));
        }
        Ok(deleted)
    }

    async fn count_referencing(
        &mut self,
        schema: &'static EntitySchema,
        column: &'static str,
        key: &EntityKey,
    ) -> StorageResult<u64> {
        self.inner.count_referencing(schema, column, key).await
    }

    async fn append_history(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
        row: &Row,
        version: i64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.inner
            .append_history(schema, owner_key, row, version, updated_at)
            .await
    }

    async fn history_for(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
    ) -> StorageResult<Vec<StoredHistoryRow>> {
        self.inner.history_for(schema, owner_key).await
    }

    async fn history_all(
        &mut self,
        schema: &'static EntitySchema,
    ) -> StorageResult<Vec<StoredHistoryRow>> {
        self.inner.history_all(schema).await
    }

    async fn delete_history_for(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
    ) -> StorageResult<u64> {
        self.inner.delete_history_for(schema, owner_key).await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let this = *self;
        Box::new(this.inner).commit().await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        let this = *self;
        Box::new(this.inner).rollback().await
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }
}
