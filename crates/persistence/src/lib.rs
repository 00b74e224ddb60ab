//! Versioned EHR Persistence Layer
//!
//! This crate stores electronic health records (patients, compositions,
//! specimens, lab tests, analyte results, CBC and blood type panels, body
//! measurements and reference ranges) and keeps an immutable history of every
//! superseded state.
//!
//! # Versioning
//!
//! Every entity starts at version 1. An update archives the pre-update row
//! into the kind's history table, tagged with the version it held, then
//! writes the merged row at `version + 1`, all inside one unit of work.
//! Deleting an entity removes its history rows in the same unit of work.
//!
//! # Architecture
//!
//! - [`core`] - Entity descriptors, the unit-of-work contract and the storage traits
//! - [`entities`] - The nine entity kinds and their partial-update types
//! - [`types`] - Keys, storage rows, typed records and payload parsing
//! - [`versioned`] - The versioned-update protocol and [`VersionedStore`]
//! - [`backends`] - Backend implementations (SQLite)
//! - [`error`] - Error types for all operations
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! # Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use ehr_persistence::backends::sqlite::SqliteBackend;
//! use ehr_persistence::entities::{Patient, PatientPatch, Sex};
//! use ehr_persistence::{HistoryStorage, RecordStorage, VersionedStore};
//!
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//! let store = VersionedStore::new(backend);
//!
//! let created = store
//!     .create(Patient::new("John", "Doe", Sex::Male, "PAT-001"))
//!     .await?;
//!
//! let patch = PatientPatch {
//!     last_name: Some("Smith".to_string()),
//!     ..Default::default()
//! };
//! let updated = store.update::<Patient>(created.key().clone(), patch).await?;
//! assert_eq!(updated.version(), 2);
//!
//! let history = store.history::<Patient>(created.key().clone()).await?;
//! assert_eq!(history[0].data().last_name, "Doe");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod entities;
pub mod error;
pub mod types;
pub mod versioned;

// Re-export commonly used types at crate root
pub use error::{ErrorCategory, StorageError, StorageResult};
pub use types::{EntityKey, HistoryRecord, Record};

// Re-export core traits
pub use core::{
    Entity, EntityKind, EntitySchema, HistoryStorage, RecordStorage, UnitOfWork,
    UnitOfWorkOptions, UnitOfWorkProvider,
};

pub use versioned::VersionedStore;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
