//! EHR record store CLI.
//!
//! Opens a SQLite record store, initializes its schema, and dumps current or
//! archived rows as JSON on stdout. Logs go to stderr.

mod commands;
mod config;

use clap::Parser;
use tracing::info;

use config::EhrConfig;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ehr={level},ehr_persistence={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EhrConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        database = %config.database_path,
        in_memory = config.is_memory(),
        version = ehr_persistence::VERSION,
        "Starting ehr"
    );

    let store = commands::open_store(&config)?;
    let output = commands::run(&store, &config.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
compile_error!("The ehr binary requires the 'sqlite' feature");
