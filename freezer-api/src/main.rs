//! freezer-api binary entry point.
//!
//! Usage:
//! ```bash
//! freezer-api --config freezer.toml
//! freezer-api --bind 127.0.0.1:9090 --log-format json
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use freezer_api::config::Config;
use freezer_api::server::{serve, FreezerApi};
use freezer_api::storage::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "freezer-api", about = "Backup session REST API", version)]
struct Cli {
    /// Path to the TOML configuration file (defaults apply when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration.
    #[arg(long)]
    bind: Option<String>,

    /// Override the SQLite database path from the configuration.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(database) = cli.database {
        config.storage.database = database;
    }

    tracing::info!(
        bind = %config.server.bind_address,
        database = %config.storage.database.display(),
        "Starting freezer-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let storage = SqliteStore::new(&config.storage.database, config.storage.max_connections)
        .await
        .context("failed to open session store")?;
    let api = Arc::new(FreezerApi::new(config, Arc::new(storage)));

    serve(api).await?;
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to init tracing: {e}"))
}
