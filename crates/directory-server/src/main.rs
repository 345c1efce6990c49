//! Supplier Directory Server
//!
//! Serves the REST API, the admin surface and the frontend shell.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use directory_access::{SessionManager, TokenManager};
use directory_api::{create_router, AppConfig, AppState};
use directory_crypto::CredentialCipher;
use directory_storage::{DirectoryStore, InMemoryStore, PgStore};

use crate::config::ServerConfig;
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::load().context("Failed to load configuration")?;

    init_telemetry(&config.telemetry)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Supplier Directory Server");

    let state = build_app_state(&config).await?;
    spawn_cleanup(state.clone(), Duration::from_secs(config.cleanup_interval_secs.max(1)));

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Builds the application state.
async fn build_app_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    let store = init_storage(config).await?;

    let cipher = CredentialCipher::new(&config.encryption_key()?).context("Failed to build password cipher")?;
    let tokens = Arc::new(TokenManager::new(config.token_config()));
    let sessions = Arc::new(SessionManager::new(config.session_config()));

    let state = AppState::builder()
        .store(store)
        .cipher(cipher)
        .tokens(tokens)
        .sessions(sessions)
        .config(AppConfig {
            service_name: config.service_name.clone(),
            debug: config.debug,
            max_body_size: config.max_body_size,
            cors_origins: config.cors_origins.clone(),
        })
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?;

    Ok(Arc::new(state))
}

/// PostgreSQL when a database URL is configured, memory otherwise.
async fn init_storage(config: &ServerConfig) -> Result<Arc<dyn DirectoryStore>> {
    match config.database.store_config() {
        Some(pg) => {
            let store = PgStore::connect(&pg).await.context("Failed to connect to database")?;
            store.migrate().await.context("Failed to run migrations")?;
            Ok(Arc::new(store))
        }
        None => {
            info!("No database configured, using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Periodically drops expired blacklist entries and stale sessions.
fn spawn_cleanup(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let flushed = state.tokens.flush_expired();
            let stats = state.sessions.cleanup();
            tracing::debug!(
                blacklist_flushed = flushed,
                sessions_active = stats.total_active,
                "Cleanup pass"
            );
        }
    });
}

/// Shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
