use serde::Deserialize;

/// Upper bound for `CACHE_TTL_DAYS`.
pub const MAX_CACHE_TTL_DAYS: u64 = crate::models::MAX_TTL_DAYS as u64;

/// Which storage backend holds prospect cache documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub cache_backend: Option<CacheBackend>,
    pub port: u16,
    pub tool_timeout_ms: u64,
    pub cache_ttl_days: i64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            cache_backend: Some(CacheBackend::Memory),
            port: 3000,
            tool_timeout_ms: crate::collector::DEFAULT_TOOL_TIMEOUT_MS,
            cache_ttl_days: crate::models::CACHE_TTL_DAYS,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = match std::env::var("DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
        {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                }
                Some(url)
            }
            Err(_) => None,
        };

        let cache_backend = match std::env::var("CACHE_BACKEND") {
            Ok(value) => Some(parse_backend(&value)?),
            Err(_) if database_url.is_some() => Some(CacheBackend::Postgres),
            Err(_) => None,
        };

        if cache_backend == Some(CacheBackend::Postgres) && database_url.is_none() {
            anyhow::bail!("CACHE_BACKEND=postgres requires DATABASE_URL");
        }

        let config = Self {
            database_url,
            cache_backend,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            tool_timeout_ms: positive_var(
                "TOOL_TIMEOUT_MS",
                crate::collector::DEFAULT_TOOL_TIMEOUT_MS,
            )?,
            cache_ttl_days: cache_ttl_days(positive_var(
                "CACHE_TTL_DAYS",
                crate::models::CACHE_TTL_DAYS as u64,
            )?)?,
            rate_limit_per_second: positive_var("RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: positive_var("RATE_LIMIT_BURST", 20)? as u32,
        };

        tracing::info!("Configuration loaded successfully");
        if let Some(ref url) = config.database_url {
            tracing::debug!("Database URL: {}...", url_prefix(url));
        }
        match config.cache_backend {
            Some(backend) => tracing::debug!("Cache backend: {:?}", backend),
            None => tracing::warn!(
                "No cache backend configured, prospect routes will answer 503"
            ),
        }
        tracing::debug!("Tool timeout: {}ms", config.tool_timeout_ms);
        tracing::debug!("Cache TTL: {} days", config.cache_ttl_days);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn parse_backend(value: &str) -> anyhow::Result<CacheBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(CacheBackend::Postgres),
        "memory" => Ok(CacheBackend::Memory),
        other => anyhow::bail!("CACHE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
    }
}

/// First 20 characters of a connection string, for logging.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

fn cache_ttl_days(days: u64) -> anyhow::Result<i64> {
    if days > MAX_CACHE_TTL_DAYS {
        anyhow::bail!(
            "CACHE_TTL_DAYS must be at most {}, got {}",
            MAX_CACHE_TTL_DAYS,
            days
        );
    }
    Ok(days as i64)
}

fn positive_var(name: &str, default: u64) -> anyhow::Result<u64> {
    let value = match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive integer", name))?,
        Err(_) => default,
    };
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
