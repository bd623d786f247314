//! `photoline-server` — photo-sharing backend.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory store, native image codec, data under ./data:
//! photoline-server
//!
//! # Persistent SQLite store and ImageMagick transforms:
//! PHOTOLINE_DB=./photoline.db PHOTOLINE_RASTER=magick photoline-server
//! ```
//!
//! # Environment variables
//!
//! See [`photoline_server::ServerConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use photoline_server::{build_router, MemoryStorage, ServerConfig, SqliteStorage, Storage};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoline_server=info,tower_http=debug".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => match SqliteStorage::open(path) {
            Ok(s) => {
                info!("storage: SQLite at {path}");
                Arc::new(s)
            }
            Err(e) => {
                error!("failed to open SQLite database at {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    info!(
        data_dir = %config.data_dir.display(),
        tmp_dir = %config.tmp_dir.display(),
        raster = %config.raster,
        poll_timeout_secs = config.poll_timeout.as_secs(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "configuration loaded"
    );

    let bind_addr = config.bind_addr;
    let app = build_router(storage, config);

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    info!("server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
