//! Error types for the persistence layer.
//!
//! Errors are grouped the same way callers need to react to them: payload
//! validation, missing entities, integrity and concurrency conflicts, and
//! storage failures. [`StorageError::category`] collapses the hierarchy onto
//! those four classes.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::core::EntityKind;
use crate::types::EntityKey;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Entity state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reference and uniqueness errors
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Versioning errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Unit of work errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to entity state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested entity was not found.
    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: EntityKey },
}

/// Errors related to payload validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required field is absent or empty.
    #[error("{kind}: missing required field '{field}'")]
    MissingRequiredField { kind: EntityKind, field: String },

    /// A field is present but its value is not acceptable.
    #[error("{kind}: invalid value for '{field}': {message}")]
    InvalidField {
        kind: EntityKind,
        field: String,
        message: String,
    },

    /// The payload could not be read as the expected shape.
    #[error("{kind}: invalid payload: {message}")]
    InvalidPayload { kind: EntityKind, message: String },
}

/// Errors raised when a write would break a reference or uniqueness rule.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// An entity with the same business key already exists.
    #[error("{kind} already exists: {key}")]
    DuplicateKey { kind: EntityKind, key: EntityKey },

    /// A reference field points at an entity that does not exist.
    #[error("{kind}.{field} references missing {target} {key}")]
    MissingReference {
        kind: EntityKind,
        field: String,
        target: EntityKind,
        key: EntityKey,
    },

    /// The entity is still referenced by current rows of another kind.
    #[error("{kind} {key} is referenced by {count} {referrer} row(s) via '{field}'")]
    Referenced {
        kind: EntityKind,
        key: EntityKey,
        referrer: EntityKind,
        field: String,
        count: u64,
    },

    /// The backend rejected the write with a constraint failure.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },
}

/// Errors related to version checks.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The stored version differs from the version the caller expected.
    #[error("version conflict on {kind} {key}: expected {expected_version}, found {actual_version}")]
    VersionConflict {
        kind: EntityKind,
        key: EntityKey,
        expected_version: i64,
        actual_version: i64,
    },
}

/// Errors related to units of work.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The unit of work could not begin or commit and was rolled back.
    #[error("unit of work rolled back: {reason}")]
    RolledBack { reason: String },

    /// The unit of work is no longer valid (already committed or rolled back).
    #[error("unit of work no longer valid")]
    InvalidTransaction,

    /// A write was attempted in a read-only unit of work.
    #[error("unit of work is read-only")]
    ReadOnly,
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// The database is locked by another writer.
    #[error("{backend_name} is busy: {message}")]
    Busy {
        backend_name: String,
        message: String,
    },

    /// Schema initialization error.
    #[error("schema initialization failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Coarse error classes surfaced to callers of the versioned store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The payload failed type or required-field checks.
    Validation,
    /// The addressed entity does not exist.
    NotFound,
    /// A reference, uniqueness or version rule was violated.
    Conflict,
    /// The backend could not complete the unit of work.
    Storage,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::NotFound => write!(f, "not-found"),
            ErrorCategory::Conflict => write!(f, "conflict"),
            ErrorCategory::Storage => write!(f, "storage"),
        }
    }
}

impl StorageError {
    /// Returns the error class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StorageError::Resource(ResourceError::NotFound { .. }) => ErrorCategory::NotFound,
            StorageError::Validation(_) => ErrorCategory::Validation,
            StorageError::Integrity(_) | StorageError::Concurrency(_) => ErrorCategory::Conflict,
            StorageError::Transaction(_) | StorageError::Backend(_) => ErrorCategory::Storage,
        }
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Storage
    }

    /// Returns true for [`ResourceError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub(crate) fn not_found(kind: EntityKind, key: &EntityKey) -> Self {
        StorageError::Resource(ResourceError::NotFound {
            kind,
            key: key.clone(),
        })
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                StorageError::Integrity(IntegrityError::ConstraintViolation {
                    message: err.to_string(),
                })
            }
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StorageError::Backend(BackendError::Busy {
                    backend_name: "sqlite".to_string(),
                    message: err.to_string(),
                })
            }
            _ => StorageError::Backend(BackendError::Internal {
                backend_name: "sqlite".to_string(),
                message: err.to_string(),
                source: Some(Box::new(err)),
            }),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
