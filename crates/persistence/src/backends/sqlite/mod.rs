//! SQLite backend implementation.
//!
//! Implements [`UnitOfWorkProvider`](crate::core::UnitOfWorkProvider) on an
//! `r2d2` pool of `rusqlite` connections. Both in-memory databases (for
//! tests) and file databases are supported.
//!
//! # Example
//!
//! ```no_run
//! use ehr_persistence::backends::sqlite::SqliteBackend;
//! use ehr_persistence::versioned::VersionedStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("./data/ehr.db")?;
//! backend.init_schema()?;
//! let store = VersionedStore::new(backend);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! One current table and one history table per entity kind, generated from
//! the descriptors (see [`EntitySchema`](crate::core::EntitySchema)). Current
//! rows carry a `version` column; history rows carry the owner key, the
//! archived business columns, the version they held, and `updated_at`.

mod backend;
mod schema;
mod transaction;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
pub use transaction::SqliteUnitOfWork;
