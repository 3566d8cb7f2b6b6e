//! userstore - user CRUD service over a pluggable storage adapter
//!
//! Reads its configuration from the environment (and `.env`), builds
//! the configured storage adapter, and serves the HTTP API. A failed
//! database connection does not abort startup; the service comes up
//! and answers 503 until redeployed with a working store.

use std::sync::Arc;

use tracing::{error, info};

use userstore::config::{ServerConfig, StorageConfig};
use userstore::server::{router, AppState};
use userstore::storage::{create_adapter, StorageAdapter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("userstore v{} starting", env!("CARGO_PKG_VERSION"));

    let storage_config = StorageConfig::from_env();
    let server_config = ServerConfig::from_env();

    let store: Option<Arc<dyn StorageAdapter>> = match create_adapter(&storage_config) {
        Some(adapter) => {
            if adapter.connect().await {
                info!("Database connected successfully");
                Some(Arc::from(adapter))
            } else {
                error!("Failed to connect to database");
                None
            }
        }
        None => {
            error!("Failed to initialize database adapter");
            None
        }
    };

    let app = router(AppState {
        store: store.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    info!("Listening on {}", server_config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = store {
        store.disconnect().await;
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
}
