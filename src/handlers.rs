use crate::collector::DataCollector;
use crate::config::Config;
use crate::csv_export::export_prospect_cache;
use crate::errors::AppError;
use crate::models::*;
use crate::prospect_cache::{create_prospect_cache_key, is_stale_after, ProspectCacheStore};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_EXPORT_LIMIT: usize = 100;
const MAX_EXPORT_LIMIT: usize = 1_000;
const MAX_SOURCE_TTL_MS: u64 = MAX_TTL_DAYS as u64 * 24 * 60 * 60 * 1000;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Prospect cache backend. `None` when no backend is configured; prospect
    /// routes then answer 503.
    pub store: Option<Arc<dyn ProspectCacheStore>>,
}

impl AppState {
    pub fn new(config: Config, store: Option<Arc<dyn ProspectCacheStore>>) -> Self {
        Self { config, store }
    }

    fn store(&self) -> Result<Arc<dyn ProspectCacheStore>, AppError> {
        self.store.clone().ok_or_else(|| {
            AppError::ServiceUnavailable("Prospect cache storage is not configured".to_string())
        })
    }

    pub fn collector(&self) -> Result<DataCollector, AppError> {
        Ok(DataCollector::new(self.store()?)
            .with_cache_ttl(chrono::Duration::days(self.config.cache_ttl_days))
            .with_tool_timeout(std::time::Duration::from_millis(
                self.config.tool_timeout_ms,
            )))
    }
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "prospect-data-api",
            "version": env!("CARGO_PKG_VERSION"),
            "cache": state.store.is_some(),
        })),
    )
}

/// POST /api/v1/prospects/collect
///
/// Returns the prospect's fresh cache record, or initializes an empty one.
/// `forceRefresh` always rebuilds.
pub async fn collect_prospect(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CollectRequest>,
) -> Result<Json<CollectResponse>, AppError> {
    tracing::info!(
        "POST /prospects/collect - prospect: {}, force_refresh: {}",
        payload.prospect.name,
        payload.force_refresh
    );

    let collector = state.collector()?;
    let outcome = collector
        .collect_prospect_data(&payload.prospect, payload.force_refresh)
        .await?;

    let stale = is_stale_after(&outcome.record, Utc::now(), collector.cache_ttl());
    Ok(Json(CollectResponse {
        cache_key: outcome.record.cache_key.clone(),
        from_cache: outcome.from_cache,
        stale,
        data_quality: outcome.record.data_quality,
        sources: outcome.sources.citations(),
        data: outcome.record,
    }))
}

/// POST /api/v1/prospects/tool-results
///
/// Persists one research tool's output for a prospect. Unknown tools are
/// acknowledged with `updated: false`.
pub async fn record_tool_result(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ToolResultRequest>,
) -> Result<Json<ToolResultResponse>, AppError> {
    tracing::info!(
        "POST /prospects/tool-results - prospect: {}, tool: {}",
        payload.prospect.name,
        payload.tool_name
    );

    let collector = state.collector()?;
    let ttl = payload
        .ttl_ms
        .map(|ms| chrono::Duration::milliseconds(ms.min(MAX_SOURCE_TTL_MS) as i64));
    let cache_key = create_prospect_cache_key(&payload.prospect);

    let written = collector
        .apply_tool_result(&payload.prospect, &payload.tool_name, payload.result, ttl)
        .await?;

    Ok(Json(ToolResultResponse {
        updated: written.is_some(),
        cache_key,
        field: crate::collector::field_for_tool(&payload.tool_name).map(|f| f.as_str()),
        data_quality: written.map(|r| r.data_quality),
    }))
}

/// GET /api/v1/prospects/cache?name=&address=&city=&state=
pub async fn get_prospect_cache(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CacheQueryParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    if params.name.trim().is_empty() {
        return Err(AppError::BadRequest("Prospect name is required".to_string()));
    }

    let store = state.store()?;
    let prospect = ProspectInput::from(params);
    let cache_key = create_prospect_cache_key(&prospect);
    tracing::info!("GET /prospects/cache - key: {}", cache_key);

    let record = store
        .get(&cache_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No cached data for '{}'", prospect.name)))?;

    let stale = is_stale_after(
        &record,
        Utc::now(),
        chrono::Duration::days(state.config.cache_ttl_days),
    );

    Ok(Json(json!({
        "cacheKey": cache_key,
        "stale": stale,
        "data": record,
    })))
}

/// GET /api/v1/prospects/export.csv?limit=
pub async fn export_prospects_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EXPORT_LIMIT)
        .clamp(1, MAX_EXPORT_LIMIT);

    let records = state.store()?.list_recent(limit).await?;
    tracing::info!("Exporting {} prospect cache record(s) as CSV", records.len());

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        export_prospect_cache(&records),
    ))
}
