/// HTTP-level tests driving the router directly with `tower::ServiceExt::oneshot`.
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use prospect_data_api::config::Config;
use prospect_data_api::handlers::AppState;
use prospect_data_api::models::{ProspectDataCache, ProspectInput, MAX_TTL_DAYS};
use prospect_data_api::prospect_cache::{
    create_prospect_cache_key, MemoryProspectCache, ProspectCacheStore,
};
use prospect_data_api::routes::build_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with_store() -> Router {
    app_over(Arc::new(MemoryProspectCache::default()))
}

fn app_over(store: Arc<dyn ProspectCacheStore>) -> Router {
    build_router(Arc::new(AppState::new(Config::default(), Some(store)))).unwrap()
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

fn app_without_store() -> Router {
    build_router(Arc::new(AppState::new(Config::default(), None))).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = app_without_store();
    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"], false);
}

#[tokio::test]
async fn test_collect_then_hit() {
    let app = app_with_store();
    let request = json!({"prospect": {"name": "Jane Doe", "state": "IL"}});

    let (status, first) =
        send_json(&app, post_json("/api/v1/prospects/collect", request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["fromCache"], false);
    assert_eq!(first["dataQuality"], "limited");
    assert_eq!(first["cacheKey"], "jane doe|||il");
    assert_eq!(first["stale"], false);

    let (_, second) = send_json(&app, post_json("/api/v1/prospects/collect", request)).await;
    assert_eq!(second["fromCache"], true);
    assert_eq!(second["data"], first["data"]);
}

#[tokio::test]
async fn test_tool_result_flow() {
    let app = app_with_store();
    let prospect = json!({"name": "Jane Doe", "city": "Springfield"});

    for tool in ["sec_insider_search", "fec_contributions", "county_assessor"] {
        let (status, body) = send_json(
            &app,
            post_json(
                "/api/v1/prospects/tool-results",
                json!({
                    "prospect": prospect,
                    "toolName": tool,
                    "result": {"url": format!("https://example.org/{}", tool)},
                    "ttlMs": 3_600_000
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);
    }

    let (status, body) = send_json(
        &app,
        get("/api/v1/prospects/cache?name=Jane%20Doe&city=Springfield"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dataQuality"], "complete");
    assert!(body["data"]["secInsider"]["expiresAt"].is_string());

    let (_, collected) = send_json(
        &app,
        post_json("/api/v1/prospects/collect", json!({"prospect": prospect})),
    )
    .await;
    assert_eq!(collected["fromCache"], true);
    assert_eq!(collected["sources"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_source_ttl_is_capped() {
    let app = app_with_store();
    let (status, body) = send_json(
        &app,
        post_json(
            "/api/v1/prospects/tool-results",
            json!({
                "prospect": {"name": "Jane Doe"},
                "toolName": "fec_contributions",
                "result": {"total": 250},
                "ttlMs": u64::MAX
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);

    let (status, body) = send_json(&app, get("/api/v1/prospects/cache?name=Jane%20Doe")).await;
    assert_eq!(status, StatusCode::OK);
    let source = &body["data"]["fecContributions"];
    let lifetime = timestamp(&source["expiresAt"]) - timestamp(&source["cachedAt"]);
    assert_eq!(lifetime, Duration::days(MAX_TTL_DAYS));
}

#[tokio::test]
async fn test_stale_record_is_served_with_stale_flag() {
    let store = Arc::new(MemoryProspectCache::default());
    let prospect = ProspectInput::new("Jane Doe").with_state("IL");
    let key = create_prospect_cache_key(&prospect);
    let long_ago = Utc::now() - Duration::days(45);
    let record = ProspectDataCache::skeleton(key.clone(), prospect, long_ago, Duration::days(30));
    store.set(&key, &record).await.unwrap();

    let app = app_over(store);
    let (status, body) = send_json(
        &app,
        get("/api/v1/prospects/cache?name=Jane%20Doe&state=IL"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stale"], true);
    assert_eq!(body["cacheKey"], key);
}

#[tokio::test]
async fn test_unknown_tool_is_not_an_error() {
    let app = app_with_store();
    let (status, body) = send_json(
        &app,
        post_json(
            "/api/v1/prospects/tool-results",
            json!({
                "prospect": {"name": "Jane Doe"},
                "toolName": "crm_lookup",
                "result": {}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], false);
    assert!(body.get("dataQuality").is_none());
}

#[tokio::test]
async fn test_blank_name_is_bad_request() {
    let app = app_with_store();
    let (status, body) = send_json(
        &app,
        post_json("/api/v1/prospects/collect", json!({"prospect": {"name": "  "}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Prospect name is required");
}

#[tokio::test]
async fn test_missing_cache_record_is_not_found() {
    let app = app_with_store();
    let (status, body) = send_json(&app, get("/api/v1/prospects/cache?name=Nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Nobody"));
}

#[tokio::test]
async fn test_without_store_returns_service_unavailable() {
    let app = app_without_store();
    let (status, body) = send_json(
        &app,
        post_json("/api/v1/prospects/collect", json!({"prospect": {"name": "Jane Doe"}})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_export_csv() {
    let app = app_with_store();
    send_json(
        &app,
        post_json(
            "/api/v1/prospects/collect",
            json!({"prospect": {"name": "Doe, Jane", "city": "Springfield"}}),
        ),
    )
    .await;

    let (status, bytes) = send(&app, get("/api/v1/prospects/export.csv?limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("cache_key,name"));
    assert!(lines[1].starts_with("doe jane||springfield|,\"Doe, Jane\",Springfield,,limited,,"));
}
