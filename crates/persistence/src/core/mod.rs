//! Core storage traits and abstractions.
//!
//! - [`EntitySchema`] - Declarative description of one entity kind
//! - [`Entity`] - Typed business fields bound to a descriptor
//! - [`UnitOfWork`] - Atomic storage primitives a backend implements
//! - [`RecordStorage`] - Versioned CRUD offered to callers
//! - [`HistoryStorage`] - Read access to archived snapshots
//!
//! # Layering
//!
//! ```text
//! RecordStorage / HistoryStorage      (VersionedStore)
//!          │
//!   versioned::protocol               (snapshot, merge, bump, cascade)
//!          │
//!     UnitOfWork                      (backend primitives)
//! ```

pub mod entity;
pub mod history;
pub mod schema;
pub mod storage;
pub mod unit_of_work;

pub use entity::Entity;
pub use history::HistoryStorage;
pub use schema::{
    Column, ColumnType, EntityKind, EntitySchema, KeyStrategy, Reference, SURROGATE_KEY_COLUMN,
    UPDATED_AT_COLUMN, VERSION_COLUMN,
};
pub use storage::RecordStorage;
pub use unit_of_work::{UnitOfWork, UnitOfWorkOptions, UnitOfWorkProvider};
