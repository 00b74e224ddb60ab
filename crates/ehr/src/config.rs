//! Command line configuration for the `ehr` binary.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EHR_DATABASE_PATH` | ehr.db | SQLite database file, or `:memory:` |
//! | `EHR_LOG_LEVEL` | info | Log level |
//! | `EHR_BUSY_TIMEOUT_MS` | 5000 | SQLite busy timeout |

use clap::{Parser, Subcommand};
use ehr_persistence::{EntityKey, EntityKind};

/// Operator CLI for the versioned EHR record store.
#[derive(Debug, Clone, Parser)]
#[command(name = "ehr")]
#[command(about = "Inspect a versioned EHR record store")]
pub struct EhrConfig {
    /// SQLite database file (`:memory:` for a throwaway database).
    #[arg(long, env = "EHR_DATABASE_PATH", default_value = "ehr.db")]
    pub database_path: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "EHR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// SQLite busy timeout in milliseconds.
    #[arg(long, env = "EHR_BUSY_TIMEOUT_MS", default_value = "5000")]
    pub busy_timeout_ms: u32,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do once the database is open.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create any missing tables and report the schema version.
    Init,

    /// Print every current row of a kind as JSON.
    List {
        /// Entity kind, by name (`LabTest`) or table (`lab_test`).
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
    },

    /// Print archived snapshots of a kind as JSON.
    History {
        /// Entity kind, by name (`LabTest`) or table (`lab_test`).
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,

        /// Only snapshots of this entity (an id, or a LOINC code for reference ranges).
        #[arg(long)]
        key: Option<String>,
    },

    /// List the entity kinds with their tables.
    Kinds,
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    EntityKind::parse(s).ok_or_else(|| format!("unknown entity kind '{}'", s))
}

/// Interprets a command line key for `kind`.
pub fn parse_key(kind: EntityKind, raw: &str) -> Result<EntityKey, String> {
    if kind.schema().has_natural_key() {
        return Ok(EntityKey::from(raw));
    }
    raw.parse::<i64>()
        .map(EntityKey::Id)
        .map_err(|_| format!("{} keys are integers, got '{}'", kind, raw))
}

impl EhrConfig {
    /// Returns true when the database lives in memory.
    pub fn is_memory(&self) -> bool {
        self.database_path == ":memory:"
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database_path.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if self.busy_timeout_ms == 0 {
            errors.push("Busy timeout cannot be 0".to_string());
        }

        if let Command::History {
            kind,
            key: Some(key),
        } = &self.command
        {
            if let Err(e) = parse_key(*kind, key) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
