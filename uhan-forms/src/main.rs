//! uhan-forms - UHAN / DAO Village assessment forms service
//!
//! Serves the form UI, live previews, PDF export and the DAO member
//! registry. Zero-config startup: the root folder and database are created
//! on first run.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use uhan_common::config::{database_path, resolve_root_folder, TomlConfig, ROOT_ENV_VARS};
use uhan_common::db::init_database;
use uhan_common::storage::SqliteStorage;
use uhan_forms::{build_router, spawn_session_reaper, storage_backend, AppState};

#[derive(Parser, Debug)]
#[command(name = "uhan-forms")]
#[command(about = "UHAN assessment forms service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Config file (defaults to the platform location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `[server] bind`
    #[arg(long)]
    bind: Option<String>,

    /// Listen port, overrides `[server] port`
    #[arg(short, long, env = "UHAN_FORMS_PORT")]
    port: Option<u16>,
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
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

    let loaded = TomlConfig::read(args.config.as_deref());
    init_tracing(&loaded.config)?;

    // Build identification first, before any slow startup work
    info!(
        "Starting UHAN Forms (uhan-forms) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    loaded.log();
    let config = loaded.config;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_ENV_VARS, &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("creating root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = database_path(&root_folder);
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready: {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let backend = storage_backend(Arc::new(SqliteStorage::new(pool)), None, &config.forms);
    let state = AppState::new(backend, config.forms.clone()).await?;
    let reaper = spawn_session_reaper(state.clone());
    let app = build_router(state);

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let port = args.port.unwrap_or(config.server.port);
    let address = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    info!("uhan-forms listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
