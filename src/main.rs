use prospect_data_api::config::{CacheBackend, Config};
use prospect_data_api::db::Database;
use prospect_data_api::db_storage::ProspectCacheStorage;
use prospect_data_api::handlers::AppState;
use prospect_data_api::prospect_cache::{
    MemoryProspectCache, ProspectCacheStore, DEFAULT_MEMORY_CAPACITY,
};
use prospect_data_api::routes::build_router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, connects the configured cache
/// backend, and serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prospect_data_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = connect_store(&config).await?;

    let app_state = Arc::new(AppState::new(config.clone(), store));
    let app = build_router(app_state)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<Option<Arc<dyn ProspectCacheStore>>> {
    match config.cache_backend {
        Some(CacheBackend::Postgres) => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL required for postgres backend"))?;
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");

            let storage = ProspectCacheStorage::new(db.pool.clone());
            storage.ensure_schema().await?;
            tracing::info!("Prospect cache table ready");
            let store: Arc<dyn ProspectCacheStore> = Arc::new(storage);
            Ok(Some(store))
        }
        Some(CacheBackend::Memory) => {
            tracing::warn!("Using in-memory prospect cache; records are lost on restart");
            let store: Arc<dyn ProspectCacheStore> =
                Arc::new(MemoryProspectCache::new(DEFAULT_MEMORY_CAPACITY));
            Ok(Some(store))
        }
        None => Ok(None),
    }
}
