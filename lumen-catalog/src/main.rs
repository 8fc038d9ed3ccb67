//! lumen-catalog - luminaire catalog service
//!
//! Zero-config startup: the root folder, database and upload folders are
//! created on first run, along with an admin account whose token is logged
//! once.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_common::api::auth::{admin_exists, create_user};
use lumen_common::config::{ServiceConfig, TomlConfig, ROOT_FOLDER_ENV};
use lumen_common::db::init_database;
use lumen_common::Role;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumen_catalog::{build_router, AppState};

/// Account created on first start
const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@localhost";

/// Command-line arguments for lumen-catalog
#[derive(Parser, Debug)]
#[command(name = "lumen-catalog")]
#[command(about = "Luminaire catalog service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LUMEN_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and uploads
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it decides the log level
    let (toml, config_error) = TomlConfig::load();
    let config = ServiceConfig::resolve(args.root_folder.as_deref(), args.port, toml);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lumen_catalog={level},lumen_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Lumen catalog (lumen-catalog) v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(e) = config_error {
        warn!("Ignoring config file: {}", e);
    }

    let folders = config.folders();
    folders
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", folders.root_folder().display());

    let db_path = folders.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    if !admin_exists(&pool).await? {
        let (admin, token) = create_user(&pool, BOOTSTRAP_ADMIN_EMAIL, Role::Admin)
            .await
            .context("Failed to create bootstrap admin")?;
        warn!(
            "Created admin account {} - token (shown once): {}",
            admin.email, token
        );
    }

    match &config.image_search_url {
        Some(url) => info!("Image search API: {}", url),
        None => info!("Image search disabled (no image_search_url configured)"),
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("lumen-catalog listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
