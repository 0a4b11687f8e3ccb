use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        Self::connect_with(database_url, 10).await
    }

    pub async fn connect_with(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        tracing::debug!("Database pool ready ({} max connections)", max_connections);

        Ok(Self { pool })
    }
}
