//! Unit-of-work traits.
//!
//! A [`UnitOfWork`] is one atomic group of storage operations. It exposes the
//! primitives the versioned-update protocol is written against: insert,
//! point lookup, full scan, update in place, delete by key, delete by owner
//! key, and history append/scan. Changes become visible only on
//! [`UnitOfWork::commit`]; dropping an unfinished unit of work rolls it back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::types::{EntityKey, Row, StoredHistoryRow, StoredRow};

use super::schema::EntitySchema;

/// Options for opening a unit of work.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWorkOptions {
    /// Whether the unit of work only reads.
    pub read_only: bool,
}

impl UnitOfWorkOptions {
    /// Creates new options with defaults (read-write).
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this as a read-only unit of work.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// An open, atomic group of storage operations.
///
/// Every primitive takes the [`EntitySchema`] of the kind it touches, so one
/// implementation serves all entity kinds.
///
/// # Example
///
/// ```ignore
/// use ehr_persistence::core::{UnitOfWorkOptions, UnitOfWorkProvider};
/// use ehr_persistence::entities::{Patient, PatientPatch};
/// use ehr_persistence::versioned::protocol;
///
/// async fn rename<P: UnitOfWorkProvider>(provider: &P) -> StorageResult<()> {
///     let mut uow = provider.begin(UnitOfWorkOptions::new()).await?;
///     let patch = PatientPatch {
///         last_name: Some("Smith-Jones".to_string()),
///         ..Default::default()
///     };
///     protocol::update::<Patient>(&mut uow, 1.into(), patch).await?;
///     Box::new(uow).commit().await
/// }
/// ```
#[async_trait]
pub trait UnitOfWork: Send {
    /// Inserts a current row with the given version.
    ///
    /// `key` must be `Some` for natural-key kinds and `None` for surrogate
    /// kinds; returns the key the row was stored under.
    async fn insert(
        &mut self,
        schema: &'static EntitySchema,
        key: Option<&EntityKey>,
        row: &Row,
        version: i64,
    ) -> StorageResult<EntityKey>;

    /// Looks up a current row by key.
    async fn fetch(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
    ) -> StorageResult<Option<StoredRow>>;

    /// Returns every current row of a kind, in storage order.
    async fn scan(&mut self, schema: &'static EntitySchema) -> StorageResult<Vec<StoredRow>>;

    /// Overwrites the business columns and version of a current row.
    ///
    /// Returns false if no row has that key.
    async fn update_in_place(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
        row: &Row,
        version: i64,
    ) -> StorageResult<bool>;

    /// Deletes a current row. Returns false if no row has that key.
    async fn delete_by_key(
        &mut self,
        schema: &'static EntitySchema,
        key: &EntityKey,
    ) -> StorageResult<bool>;

    /// Counts current rows of `schema` whose `column` holds `key`.
    async fn count_referencing(
        &mut self,
        schema: &'static EntitySchema,
        column: &'static str,
        key: &EntityKey,
    ) -> StorageResult<u64>;

    /// Appends an immutable snapshot to the kind's history table.
    ///
    /// Returns the generated history row id.
    async fn append_history(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
        row: &Row,
        version: i64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<i64>;

    /// Returns the snapshots of one entity, oldest version first.
    async fn history_for(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
    ) -> StorageResult<Vec<StoredHistoryRow>>;

    /// Returns every snapshot of a kind, in history-id order.
    async fn history_all(
        &mut self,
        schema: &'static EntitySchema,
    ) -> StorageResult<Vec<StoredHistoryRow>>;

    /// Deletes every snapshot of one entity. Returns the number removed.
    async fn delete_history_for(
        &mut self,
        schema: &'static EntitySchema,
        owner_key: &EntityKey,
    ) -> StorageResult<u64>;

    /// Commits all changes.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discards all changes.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Returns true until the unit of work is committed or rolled back.
    fn is_active(&self) -> bool;
}

/// Opens units of work against a backend.
#[async_trait]
pub trait UnitOfWorkProvider: Send + Sync {
    /// The unit-of-work type.
    type UnitOfWork: UnitOfWork + 'static;

    /// Returns a short backend name such as `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    /// Opens a new unit of work.
    async fn begin(&self, options: UnitOfWorkOptions) -> StorageResult<Self::UnitOfWork>;
}

#[async_trait]
impl<P: UnitOfWorkProvider> UnitOfWorkProvider for Arc<P> {
    type UnitOfWork = P::UnitOfWork;

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    async fn begin(&self, options: UnitOfWorkOptions) -> StorageResult<Self::UnitOfWork> {
        (**self).begin(options).await
    }
}
