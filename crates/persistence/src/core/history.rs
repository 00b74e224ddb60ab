//! History access.
//!
//! History rows are written only by the versioned-update protocol and removed
//! only by a cascading delete. This trait exposes them read-only, as raw
//! snapshots.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{EntityKey, HistoryRecord};

use super::entity::Entity;
use super::storage::RecordStorage;

/// Read access to archived snapshots.
#[async_trait]
pub trait HistoryStorage: RecordStorage {
    /// Returns the snapshots of one entity, oldest version first.
    ///
    /// An entity that was never updated, or no longer exists, has no
    /// snapshots; this is not an error.
    async fn history<E: Entity>(&self, key: EntityKey) -> StorageResult<Vec<HistoryRecord<E>>>;

    /// Returns every snapshot of a kind.
    async fn history_all<E: Entity>(&self) -> StorageResult<Vec<HistoryRecord<E>>>;
}
