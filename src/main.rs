use std::sync::Arc;

use school_api::app::{app, AppState};
use school_api::config::{config, StorageBackend};
use school_api::database::{DatabaseManager, MemoryStore, PgStore, SchoolStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting School API in {:?} mode", config.environment);

    let store: Arc<dyn SchoolStore> = match config.storage {
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::bootstrap_schema(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            if !school_api::is_development!() {
                tracing::warn!("Using in-memory store outside development; data is lost on shutdown");
            }
            Arc::new(MemoryStore::new())
        }
    };

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let state = AppState::new(store, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("School API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
