//! logkeep - log record service
//!
//! Serves the `/logs` HTTP API, or ingests newline-delimited queue payloads
//! from stdin, against PostgreSQL or an in-memory store.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use logkeep_core::{
    queue_channel, LogRecordStore, LogService, MemoryLogStore, PgLogStore, QueueConsumer,
};
use logkeep_server::{http, ApiOptions, ServerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "logkeep")]
#[command(about = "Validating log record service")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// PostgreSQL connection URL
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// HTTP listen address
    #[arg(long, global = true, env = "LOGKEEP_BIND")]
    bind: Option<SocketAddr>,

    /// Name stamped on records the service writes itself
    #[arg(long, global = true, env = "LOGKEEP_SERVICE_NAME")]
    service_name: Option<String>,

    /// Honour `DELETE /logs?truncate=true`
    #[arg(long, global = true, env = "LOGKEEP_ALLOW_TRUNCATE")]
    allow_truncate: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Keep records in memory instead of PostgreSQL
        #[arg(long)]
        memory: bool,

        /// Create the log table if it does not exist
        #[arg(long)]
        init_schema: bool,
    },

    /// Ingest newline-delimited queue payloads from stdin
    Ingest {
        /// Keep records in memory instead of PostgreSQL
        #[arg(long)]
        memory: bool,

        /// Create the log table if it does not exist
        #[arg(long)]
        init_schema: bool,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "logkeep.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Serve {
            memory,
            init_schema,
        } => {
            if memory {
                run_server(MemoryLogStore::new(), &config).await?;
            } else {
                run_server(connect(&config, init_schema).await?, &config).await?;
            }
        }

        Commands::Ingest {
            memory,
            init_schema,
        } => {
            if memory {
                run_ingest(MemoryLogStore::new(), &config).await?;
            } else {
                run_ingest(connect(&config, init_schema).await?, &config).await?;
            }
        }

        Commands::InitConfig { output } => {
            init_config(&output, &config)?;
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Loads the config file, if any, and applies command-line and env overrides.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match cli.config {
        Some(ref path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(ref url) = cli.database_url {
        config = config.with_database_url(url.clone());
    }
    if let Some(addr) = cli.bind {
        config = config.with_bind_addr(addr);
    }
    if let Some(ref name) = cli.service_name {
        config = config.with_service_name(name.clone());
    }
    if cli.allow_truncate {
        config = config.with_allow_truncate(true);
    }

    config.validate()?;
    Ok(config)
}

async fn connect(config: &ServerConfig, init_schema: bool) -> anyhow::Result<PgLogStore> {
    let url = config
        .database_url
        .as_deref()
        .context("database_url is required unless --memory is given")?;

    let store = PgLogStore::connect(url, config.max_connections).await?;
    if init_schema {
        store.ensure_schema().await?;
        info!("log table ready");
    }
    Ok(store)
}

async fn run_server<S>(store: S, config: &ServerConfig) -> anyhow::Result<()>
where
    S: LogRecordStore + 'static,
{
    info!(
        bind = %config.bind_addr,
        service = %config.service_name,
        allow_truncate = config.allow_truncate,
        "starting logkeep"
    );
    if config.allow_truncate {
        warn!("truncation over HTTP is enabled");
    }

    let service = Arc::new(LogService::new(store).with_service_name(config.service_name.clone()));
    let listener = http::bind(config.bind_addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if matches!(tokio::signal::ctrl_c().await, Ok(())) {
            info!("received interrupt, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    http::serve(listener, service, ApiOptions::from(config), shutdown_rx).await?;
    Ok(())
}

async fn run_ingest<S>(store: S, config: &ServerConfig) -> anyhow::Result<()>
where
    S: LogRecordStore + 'static,
{
    let service = Arc::new(LogService::new(store).with_service_name(config.service_name.clone()));
    let (tx, rx) = queue_channel(config.queue_capacity);
    let consumer = tokio::spawn(QueueConsumer::new(service, rx).run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(line.into_bytes()).await.is_err() {
            warn!("queue consumer stopped early");
            break;
        }
    }
    drop(tx);

    let stats = consumer.await?;
    println!(
        "ingested {} messages: {} stored, {} failures logged, {} dropped",
        stats.total(),
        stats.stored,
        stats.failures_logged,
        stats.dropped
    );
    Ok(())
}

fn init_config(output: &Path, config: &ServerConfig) -> anyhow::Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    std::fs::write(output, config.to_json_pretty()?)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Config written to: {}", output.display());
    Ok(())
}
