use crate::handlers::{self, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Tool payloads can be large web-search dumps; 5MB is the ceiling.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Builds the HTTP application.
///
/// Prospect routes sit behind a per-IP rate limiter and a body size limit;
/// `/health` bypasses both.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(state.config.rate_limit_per_second)
            .burst_size(state.config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    let protected_routes = Router::new()
        .route(
            "/api/v1/prospects/collect",
            post(handlers::collect_prospect),
        )
        .route(
            "/api/v1/prospects/tool-results",
            post(handlers::record_tool_result),
        )
        .route("/api/v1/prospects/cache", get(handlers::get_prospect_cache))
        .route(
            "/api/v1/prospects/export.csv",
            get(handlers::export_prospects_csv),
        )
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
