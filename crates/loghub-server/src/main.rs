//! loghub Server
//!
//! Main entry point for the loghub log distribution server.
//!
//! ## Configuration
//! All configuration is done via environment variables:
//!
//! - `LOGHUB_ADDR`: Server bind address (default: 0.0.0.0:3000)
//! - `LOGHUB_DB`: SQLite database path (default: ./data/loghub.db)
//! - `LOGHUB_SWEEP_INTERVAL_SECS`: Retention sweep interval (default: 3600)
//! - `RUST_LOG`: Log level filter (default: info)
//!
//! ## Example
//! ```bash
//! export LOGHUB_DB=./data/loghub.db
//! RUST_LOG=debug cargo run -p loghub-server
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::info;

use loghub_core::KeepaliveConfig;
use loghub_server::retention::{RetentionSweeper, SweeperConfig};
use loghub_server::store::{IdentityStore, RecordStore, SqliteStore};
use loghub_server::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Configuration
    let bind_addr = std::env::var("LOGHUB_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let db_path = std::env::var("LOGHUB_DB").unwrap_or_else(|_| "./data/loghub.db".to_string());
    let sweep_interval: u64 = std::env::var("LOGHUB_SWEEP_INTERVAL_SECS")
        .unwrap_or_else(|_| "3600".to_string())
        .parse()?;

    // Initialize the store
    if let Some(parent) = Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    info!("initializing store at {db_path}");
    let store = Arc::new(SqliteStore::new(&db_path).await?);
    let identities: Arc<dyn IdentityStore> = store.clone();
    let records: Arc<dyn RecordStore> = store;

    let state = AppState::new(
        identities.clone(),
        records.clone(),
        KeepaliveConfig::default(),
    );

    // Start the retention sweeper
    let sweeper = Arc::new(RetentionSweeper::new(
        identities,
        records,
        SweeperConfig {
            interval: Duration::from_secs(sweep_interval),
        },
    ));
    let (sweep_shutdown_tx, sweep_shutdown_rx) = oneshot::channel();
    let sweep_handle = sweeper.start(sweep_shutdown_rx);

    // Serve
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("loghub server listening on {bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = sweep_shutdown_tx.send(());
    let _ = sweep_handle.await;
    info!("server shut down gracefully");

    Ok(())
}

/// Completes when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
