//! Versioned entities with history archival.
//!
//! [`protocol`] holds the update and delete algorithms, written once against
//! the [`UnitOfWork`](crate::core::UnitOfWork) primitives and driven by each
//! kind's descriptor. [`VersionedStore`] wraps them into the
//! [`RecordStorage`](crate::core::RecordStorage) and
//! [`HistoryStorage`](crate::core::HistoryStorage) traits.

pub mod protocol;
mod store;

pub use protocol::INITIAL_VERSION;
pub use store::VersionedStore;
