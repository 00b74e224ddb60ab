//! The versioned-update protocol.
//!
//! Each function runs inside a unit of work supplied by the caller and never
//! commits or rolls back on its own. Callers that want one atomic unit per
//! operation use [`VersionedStore`](super::VersionedStore); callers grouping
//! several operations open the unit of work themselves.
//!
//! # Update
//!
//! 1. Load the current row (`NotFound` if absent).
//! 2. Merge the patch, validate the result and resolve its references.
//!    Nothing has been written yet.
//! 3. Append a snapshot of the loaded row to the history table, tagged with
//!    the version it held and the current time.
//! 4. Overwrite the current row with the merged fields at `version + 1`.
//!
//! # Delete
//!
//! 1. Load the current row (`NotFound` if absent).
//! 2. Refuse if any current row of another kind references it.
//! 3. Delete every history row of the entity, then the current row.

use chrono::Utc;
use tracing::debug;

use crate::core::{Entity, EntitySchema, UnitOfWork};
use crate::error::{ConcurrencyError, IntegrityError, StorageError, StorageResult};
use crate::types::{EntityKey, HistoryRecord, Record, Row};

/// Version assigned to newly created entities.
pub const INITIAL_VERSION: i64 = 1;

/// Creates an entity at [`INITIAL_VERSION`].
pub async fn create<E: Entity>(uow: &mut dyn UnitOfWork, data: E) -> StorageResult<Record<E>> {
    let schema = E::SCHEMA;
    data.validate()?;
    let row = data.to_row();
    check_references(uow, schema, &row).await?;

    let natural_key = data.natural_key();
    if let Some(key) = &natural_key {
        if uow.fetch(schema, key).await?.is_some() {
            return Err(IntegrityError::DuplicateKey {
                kind: schema.kind,
                key: key.clone(),
            }
            .into());
        }
    }

    let key = uow
        .insert(schema, natural_key.as_ref(), &row, INITIAL_VERSION)
        .await?;
    debug!(kind = %schema.kind, key = %key, "created");
    Ok(Record::new(key, INITIAL_VERSION, data))
}

/// Reads the current state of an entity.
pub async fn read<E: Entity>(uow: &mut dyn UnitOfWork, key: EntityKey) -> StorageResult<Record<E>> {
    let stored = uow
        .fetch(E::SCHEMA, &key)
        .await?
        .ok_or_else(|| StorageError::not_found(E::SCHEMA.kind, &key))?;
    Record::from_stored(stored)
}

/// Lists every current entity of a kind.
pub async fn list<E: Entity>(uow: &mut dyn UnitOfWork) -> StorageResult<Vec<Record<E>>> {
    uow.scan(E::SCHEMA)
        .await?
        .into_iter()
        .map(Record::from_stored)
        .collect()
}

/// Applies a partial update, last writer wins.
pub async fn update<E: Entity>(
    uow: &mut dyn UnitOfWork,
    key: EntityKey,
    patch: E::Patch,
) -> StorageResult<Record<E>> {
    apply_update(uow, key, None, patch).await
}

/// Applies a partial update if the live version is still `expected_version`.
pub async fn update_with_match<E: Entity>(
    uow: &mut dyn UnitOfWork,
    key: EntityKey,
    expected_version: i64,
    patch: E::Patch,
) -> StorageResult<Record<E>> {
    apply_update(uow, key, Some(expected_version), patch).await
}

async fn apply_update<E: Entity>(
    uow: &mut dyn UnitOfWork,
    key: EntityKey,
    expected_version: Option<i64>,
    patch: E::Patch,
) -> StorageResult<Record<E>> {
    let schema = E::SCHEMA;
    let stored = uow
        .fetch(schema, &key)
        .await?
        .ok_or_else(|| StorageError::not_found(schema.kind, &key))?;

    if let Some(expected) = expected_version {
        if stored.version != expected {
            return Err(ConcurrencyError::VersionConflict {
                kind: schema.kind,
                key,
                expected_version: expected,
                actual_version: stored.version,
            }
            .into());
        }
    }

    let mut data = Record::<E>::from_stored(stored.clone())?.into_data();
    data.apply(patch);
    data.validate()?;
    let row = data.to_row();
    check_references(uow, schema, &row).await?;

    let history_id = uow
        .append_history(schema, &stored.key, &stored.row, stored.version, Utc::now())
        .await?;
    debug!(
        kind = %schema.kind,
        key = %key,
        version = stored.version,
        history_id,
        "archived snapshot"
    );

    let next_version = stored.version + 1;
    if !uow.update_in_place(schema, &key, &row, next_version).await? {
        return Err(StorageError::not_found(schema.kind, &key));
    }
    Ok(Record::new(key, next_version, data))
}

/// Deletes an entity and all of its history rows.
pub async fn delete<E: Entity>(uow: &mut dyn UnitOfWork, key: EntityKey) -> StorageResult<()> {
    delete_by_schema(uow, E::SCHEMA, key).await
}

/// Untyped form of [`delete`], driven by the descriptor alone.
pub async fn delete_by_schema(
    uow: &mut dyn UnitOfWork,
    schema: &'static EntitySchema,
    key: EntityKey,
) -> StorageResult<()> {
    if uow.fetch(schema, &key).await?.is_none() {
        return Err(StorageError::not_found(schema.kind, &key));
    }

    for (referrer, reference) in EntitySchema::referencing(schema.kind) {
        let count = uow
            .count_referencing(referrer, reference.column, &key)
            .await?;
        if count > 0 {
            return Err(IntegrityError::Referenced {
                kind: schema.kind,
                key,
                referrer: referrer.kind,
                field: reference.column.to_string(),
                count,
            }
            .into());
        }
    }

    let removed = uow.delete_history_for(schema, &key).await?;
    debug!(kind = %schema.kind, key = %key, removed, "deleted history");
    if !uow.delete_by_key(schema, &key).await? {
        return Err(StorageError::not_found(schema.kind, &key));
    }
    Ok(())
}

/// Returns the snapshots of one entity, oldest version first.
pub async fn history<E: Entity>(
    uow: &mut dyn UnitOfWork,
    key: EntityKey,
) -> StorageResult<Vec<HistoryRecord<E>>> {
    uow.history_for(E::SCHEMA, &key)
        .await?
        .into_iter()
        .map(HistoryRecord::from_stored)
        .collect()
}

/// Returns every snapshot of a kind.
pub async fn history_all<E: Entity>(
    uow: &mut dyn UnitOfWork,
) -> StorageResult<Vec<HistoryRecord<E>>> {
    uow.history_all(E::SCHEMA)
        .await?
        .into_iter()
        .map(HistoryRecord::from_stored)
        .collect()
}

async fn check_references(
    uow: &mut dyn UnitOfWork,
    schema: &'static EntitySchema,
    row: &Row,
) -> StorageResult<()> {
    for reference in schema.references {
        let Some(target_key) = row.get(reference.column).and_then(|v| v.as_key()) else {
            continue;
        };
        if uow
            .fetch(reference.target.schema(), &target_key)
            .await?
            .is_none()
        {
            return Err(IntegrityError::MissingReference {
                kind: schema.kind,
                field: reference.column.to_string(),
                target: reference.target,
                key: target_key,
            }
            .into());
        }
    }
    Ok(())
}
