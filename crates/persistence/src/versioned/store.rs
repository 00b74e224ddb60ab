//! One-unit-of-work-per-call storage facade.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::core::{
    Entity, HistoryStorage, RecordStorage, UnitOfWork, UnitOfWorkOptions, UnitOfWorkProvider,
};
use crate::error::StorageResult;
use crate::types::{EntityKey, HistoryRecord, Record};

use super::protocol;

/// Runs every protocol operation in its own unit of work.
///
/// The unit of work is committed when the operation succeeds and rolled back
/// when it fails; the operation's error is returned unchanged.
///
/// # Example
///
/// ```ignore
/// use ehr_persistence::backends::sqlite::SqliteBackend;
/// use ehr_persistence::core::RecordStorage;
/// use ehr_persistence::entities::{Patient, Sex};
/// use ehr_persistence::versioned::VersionedStore;
///
/// let backend = SqliteBackend::in_memory()?;
/// backend.init_schema()?;
/// let store = VersionedStore::new(backend);
/// let patient = store.create(Patient::new("Jane", "Roe", Sex::Female, "PAT-002")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct VersionedStore<P> {
    provider: P,
}

impl<P: UnitOfWorkProvider> VersionedStore<P> {
    /// Creates a store over a unit-of-work provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn begin_write(&self) -> StorageResult<P::UnitOfWork> {
        self.provider.begin(UnitOfWorkOptions::new()).await
    }

    async fn begin_read(&self) -> StorageResult<P::UnitOfWork> {
        self.provider.begin(UnitOfWorkOptions::new().read_only()).await
    }

    async fn finish<T: Send>(uow: P::UnitOfWork, result: StorageResult<T>) -> StorageResult<T> {
        match result {
            Ok(value) => {
                Box::new(uow).commit().await?;
                Ok(value)
            }
            Err(err) => {
                if err.is_not_found() {
                    debug!(error = %err, "rolling back unit of work");
                } else {
                    warn!(error = %err, "rolling back unit of work");
                }
                if let Err(rollback_err) = Box::new(uow).rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<P> RecordStorage for VersionedStore<P>
where
    P: UnitOfWorkProvider,
{
    fn backend_name(&self) -> &'static str {
        self.provider.backend_name()
    }

    #[instrument(skip(self, data), fields(kind = %E::SCHEMA.kind))]
    async fn create<E: Entity>(&self, data: E) -> StorageResult<Record<E>> {
        let mut uow = self.begin_write().await?;
        let result = protocol::create(&mut uow, data).await;
        Self::finish(uow, result).await
    }

    #[instrument(skip(self), fields(kind = %E::SCHEMA.kind, key = %key))]
    async fn read<E: Entity>(&self, key: EntityKey) -> StorageResult<Record<E>> {
        let mut uow = self.begin_read().await?;
        let result = protocol::read(&mut uow, key).await;
        Self::finish(uow, result).await
    }

    #[instrument(skip(self), fields(kind = %E::SCHEMA.kind))]
    async fn list<E: Entity>(&self) -> StorageResult<Vec<Record<E>>> {
        let mut uow = self.begin_read().await?;
        let result = protocol::list(&mut uow).await;
        Self::finish(uow, result).await
    }

    #[instrument(skip(self, patch), fields(kind = %E::SCHEMA.kind, key = %key))]
    async fn update<E: Entity>(&self, key: EntityKey, patch: E::Patch) -> StorageResult<Record<E>> {
        let mut uow = self.begin_write().await?;
        let result = protocol::update(&mut uow, key, patch).await;
        Self::finish(uow, result).await
    }

    #[instrument(skip(self, patch), fields(kind = %E::SCHEMA.kind, key = %key))]
    async fn update_with_match<E: Entity>(
        &self,
        key: EntityKey,
        expected_version: i64,
        patch: E::Patch,
    ) -> StorageResult<Record<E>> {
        let mut uow = self.begin_write().await?;
        let result = protocol::update_with_match(&mut uow, key, expected_version, patch).await;
        Self::finish(uow, result).await
    }

    #[instrument(skip(self), fields(kind = %E::SCHEMA.kind, key = %key))]
    async fn delete<E: Entity>(&self, key: EntityKey) -> StorageResult<()> {
        let mut uow = self.begin_write().await?;
        let result = protocol::delete::<E>(&mut uow, key).await;
        Self::finish(uow, result).await
    }
}

#[async_trait]
impl<P> HistoryStorage for VersionedStore<P>
where
    P: UnitOfWorkProvider,
{
    #[instrument(skip(self), fields(kind = %E::SCHEMA.kind, key = %key))]
    async fn history<E: Entity>(&self, key: EntityKey) -> StorageResult<Vec<HistoryRecord<E>>> {
        let mut uow = self.begin_read().await?;
        let result = protocol::history(&mut uow, key).await;
        Self::finish(uow, result).await
    }

    #[instrument(skip(self), fields(kind = %E::SCHEMA.kind))]
    async fn history_all<E: Entity>(&self) -> StorageResult<Vec<HistoryRecord<E>>> {
        let mut uow = self.begin_read().await?;
        let result = protocol::history_all(&mut uow).await;
        Self::finish(uow, result).await
    }
}
