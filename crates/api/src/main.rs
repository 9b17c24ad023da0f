mod auth;
mod config;
mod error;
mod middleware;
mod routes;
mod state;


use record_lake_core::{InMemoryStorage, PgStorage};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use crate::config::StorageBackend;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config = config::AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!(backend = ?config.storage_backend, "Starting Record Lake API server");

    let schemas = config.resource_schemas()?;
    let mounted: Vec<&str> = schemas.iter().map(|schema| schema.plural).collect();
    tracing::info!(resources = ?mounted, prefix = %config.api_prefix, "Mounting resources");

    let app = match config.storage_backend {
        StorageBackend::Memory => {
            routes::build_router(AppState::new(InMemoryStorage::new(), config.clone(), schemas))
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres storage"))?;

            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .min_connections(config.db_min_connections)
                .connect(database_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;

            tracing::info!("Connected to PostgreSQL");

            let storage = PgStorage::new(pool);
            storage
                .migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;

            tracing::info!("Database migrations applied");

            routes::build_router(AppState::new(storage, config.clone(), schemas))
        }
    };

    let app = app
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer(config.cors_origin.as_deref()));

    // Start server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
/// A handler that fails to install never fires; the other still does.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
