use crate::errors::{AppError, ResultExt};
use crate::models::ProspectDataCache;
use crate::prospect_cache::ProspectCacheStore;
use async_trait::async_trait;
use sqlx::PgPool;

/// Postgres-backed prospect cache.
///
/// One row per cache key. The full document lives in a JSONB column; the
/// other columns mirror a few document fields for listing and inspection.
pub struct ProspectCacheStorage {
    pool: PgPool,
}

impl ProspectCacheStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the cache table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prospect_data_cache (
                cache_key TEXT PRIMARY KEY,
                prospect_name TEXT NOT NULL,
                data JSONB NOT NULL,
                data_quality TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating prospect_data_cache table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS prospect_data_cache_updated_at_idx \
             ON prospect_data_cache (updated_at DESC)",
        )
        .execute(&self.pool)
        .await
        .context("creating prospect_data_cache index")?;

        Ok(())
    }
}

#[async_trait]
impl ProspectCacheStore for ProspectCacheStorage {
    async fn get(&self, cache_key: &str) -> Result<Option<ProspectDataCache>, AppError> {
        let row = sqlx::query_as::<_, (serde_json::Value,)>(
            "SELECT data FROM prospect_data_cache WHERE cache_key = $1",
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("loading prospect cache '{}'", cache_key))?;

        match row {
            Some((data,)) => match serde_json::from_value(data) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    // Treat an unreadable document as a miss; the next write replaces it.
                    tracing::warn!(
                        "Prospect cache row '{}' has an unreadable document: {}",
                        cache_key,
                        e
                    );
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set(&self, cache_key: &str, record: &ProspectDataCache) -> Result<(), AppError> {
        let data = serde_json::to_value(record)?;

        sqlx::query(
            r#"
            INSERT INTO prospect_data_cache (
                cache_key, prospect_name, data, data_quality,
                created_at, updated_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (cache_key) DO UPDATE
            SET prospect_name = EXCLUDED.prospect_name,
                data = EXCLUDED.data,
                data_quality = EXCLUDED.data_quality,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(cache_key)
        .bind(&record.prospect.name)
        .bind(data)
        .bind(record.data_quality.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("writing prospect cache '{}'", cache_key))?;

        tracing::debug!(
            "Stored prospect cache '{}' (quality: {})",
            cache_key,
            record.data_quality.as_str()
        );
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ProspectDataCache>, AppError> {
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            "SELECT data FROM prospect_data_cache ORDER BY updated_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("listing prospect cache")?;

        Ok(rows
            .into_iter()
            .filter_map(|(data,)| serde_json::from_value(data).ok())
            .collect())
    }
}
