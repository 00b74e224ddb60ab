//! Database backend implementations.
//!
//! Each backend implements the unit-of-work primitives and is gated behind a
//! feature flag.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite` | Embedded database, in-memory or file based |

#[cfg(feature = "sqlite")]
pub mod sqlite;
