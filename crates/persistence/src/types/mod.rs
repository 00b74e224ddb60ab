//! Core types for the persistence layer.
//!
//! - [`EntityKey`] - Surrogate or natural key of a current row
//! - [`FieldValue`], [`Row`] - Storage-neutral column values
//! - [`StoredRow`], [`StoredHistoryRow`] - What the storage primitives return
//! - [`Record`], [`HistoryRecord`] - Typed views handed to callers
//! - [`payload`] - JSON ingress for create and patch inputs

mod key;
pub mod payload;
mod record;
mod row;

pub use key::EntityKey;
pub use record::{HistoryRecord, Record};
pub use row::{FieldValue, Row, StoredHistoryRow, StoredRow};
