//! mindrate-server - survey distribution backend
//!
//! Study directors' questionnaires go out to the mobile client through
//! `/download/`, answers come back through `/receive_answer/`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use mindrate_common::config::{ConfigOverrides, ServiceConfig, TomlConfig};
use mindrate_common::db::init_database;
use mindrate_server::{build_router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments; each overrides environment and TOML settings
#[derive(Debug, Parser)]
#[command(name = "mindrate-server", version, about = "Survey distribution backend")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8000
    #[arg(long)]
    bind: Option<String>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(config: &ServiceConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::load_optional(args.config.as_deref())?;
    let config = ServiceConfig::resolve(
        ConfigOverrides {
            database_path: args.database,
            bind_address: args.bind,
            log_level: args.log_level,
        },
        toml,
    );

    init_tracing(&config)?;

    // Build identification right after tracing init
    info!(
        "Starting mindrate-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let app = build_router(AppState::new(pool));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Cannot bind {}", config.bind_address))?;
    info!("mindrate-server listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
