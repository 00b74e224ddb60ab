//! Subcommand implementations.
//!
//! Each dump is typed: the kind picked on the command line selects the
//! entity type, and records are serialized with their business fields
//! flattened next to the key and version.

use anyhow::Context;
use ehr_persistence::backends::sqlite::{SCHEMA_VERSION, SqliteBackend, SqliteBackendConfig};
use ehr_persistence::entities::{
    BloodTypePanel, BodyMeasurement, CbcPanel, Composition, LabAnalyteResult, LabTest, Patient,
    ReferenceRange, Specimen,
};
use ehr_persistence::{
    Entity, EntityKey, EntityKind, HistoryStorage, RecordStorage, VersionedStore,
};
use serde_json::{Value, json};
use tracing::info;

use crate::config::{Command, EhrConfig, parse_key};

/// Store type the CLI works against.
pub type Store = VersionedStore<SqliteBackend>;

/// Expands to a `match` calling `$f::<E>($args)` for the entity type of `$kind`.
macro_rules! dispatch {
    ($kind:expr, $f:ident($($arg:expr),*)) => {
        match $kind {
            EntityKind::Patient => $f::<Patient>($($arg),*).await,
            EntityKind::Composition => $f::<Composition>($($arg),*).await,
            EntityKind::Specimen => $f::<Specimen>($($arg),*).await,
            EntityKind::LabTest => $f::<LabTest>($($arg),*).await,
            EntityKind::LabAnalyteResult => $f::<LabAnalyteResult>($($arg),*).await,
            EntityKind::CbcPanel => $f::<CbcPanel>($($arg),*).await,
            EntityKind::BloodTypePanel => $f::<BloodTypePanel>($($arg),*).await,
            EntityKind::BodyMeasurement => $f::<BodyMeasurement>($($arg),*).await,
            EntityKind::ReferenceRange => $f::<ReferenceRange>($($arg),*).await,
        }
    };
}

/// Opens the configured database and creates any missing tables.
pub fn open_store(config: &EhrConfig) -> anyhow::Result<Store> {
    info!(database = %config.database_path, "Opening SQLite database");

    let backend_config = SqliteBackendConfig {
        busy_timeout_ms: config.busy_timeout_ms,
        ..Default::default()
    };
    let backend = SqliteBackend::with_config(&config.database_path, backend_config)
        .with_context(|| format!("failed to open {}", config.database_path))?;
    backend.init_schema()?;

    Ok(VersionedStore::new(backend))
}

/// Runs the configured subcommand and returns its JSON output.
pub async fn run(store: &Store, command: &Command) -> anyhow::Result<Value> {
    match command {
        Command::Init => {
            store.provider().health_check().await?;
            Ok(json!({
                "backend": store.backend_name(),
                "schema_version": SCHEMA_VERSION,
            }))
        }
        Command::List { kind } => dispatch!(*kind, dump_current(store)),
        Command::History { kind, key } => {
            let key = key
                .as_deref()
                .map(|raw| parse_key(*kind, raw))
                .transpose()
                .map_err(anyhow::Error::msg)?;
            dispatch!(*kind, dump_history(store, key))
        }
        Command::Kinds => Ok(Value::Array(
            EntityKind::ALL
                .iter()
                .map(|kind| {
                    let schema = kind.schema();
                    json!({
                        "kind": kind.as_str(),
                        "table": schema.table,
                        "history_table": schema.history_table,
                        "key": schema.key_column(),
                    })
                })
                .collect(),
        )),
    }
}

async fn dump_current<E: Entity>(store: &Store) -> anyhow::Result<Value> {
    let records = store.list::<E>().await?;
    info!(kind = %E::SCHEMA.kind, count = records.len(), "Listed current rows");
    Ok(serde_json::to_value(records)?)
}

async fn dump_history<E: Entity>(store: &Store, key: Option<EntityKey>) -> anyhow::Result<Value> {
    let snapshots = match key {
        Some(key) => store.history::<E>(key).await?,
        None => store.history_all::<E>().await?,
    };
    info!(kind = %E::SCHEMA.kind, count = snapshots.len(), "Listed history rows");
    Ok(serde_json::to_value(snapshots)?)
}
