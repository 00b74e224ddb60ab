//! The [`Entity`] trait binding a typed struct to its descriptor.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageResult, ValidationError};
use crate::types::{EntityKey, Row};

use super::schema::EntitySchema;

/// A typed entity kind.
///
/// Implementors hold only business fields; the key and version live in
/// [`Record`](crate::types::Record). Partial updates are expressed as an
/// explicit [`Entity::Patch`] type merged by [`Entity::apply`], so every kind
/// follows the same "only present fields overwrite" rule.
pub trait Entity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Optional-field update record for this kind.
    type Patch: Debug + Default + Send + Sync + DeserializeOwned + 'static;

    /// Storage descriptor.
    const SCHEMA: &'static EntitySchema;

    /// Checks required fields and value formats.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Converts the business fields into a storage row.
    fn to_row(&self) -> Row;

    /// Reads the business fields back from a storage row.
    fn from_row(row: &Row) -> StorageResult<Self>;

    /// Merges a patch into `self`, overwriting only the fields it carries.
    fn apply(&mut self, patch: Self::Patch);

    /// The caller-supplied key, for kinds keyed by a business column.
    fn natural_key(&self) -> Option<EntityKey> {
        None
    }
}
