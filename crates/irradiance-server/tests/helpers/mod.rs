//! Test helpers for irradiance server integration tests
//!
//! - Router construction with tiers pointed at mock upstreams
//! - Request helpers for `oneshot` calls
//! - Upstream payload fixtures

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use irradiance_server::{
    api::{self, AppState},
    config::Config,
    features::resolve::{Orchestrator, PgCoordinateCache, Tier1Client, Tier2Client, Tier3Grid},
    middleware::USER_ID_HEADER,
};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};

pub const TEST_CALLER: &str = "integration-tests";

/// Config with both live tiers pointed at `upstream`
///
/// Tier 1 gets an API key only when `tier1_enabled` is set.
pub fn test_config(upstream: &str, tier1_enabled: bool) -> Config {
    let mut config = Config::default();
    config.resolver.tier_timeout_secs = 2;
    config.resolver.tier1.base_url = format!("{upstream}/psm3.csv");
    config.resolver.tier1.api_key = tier1_enabled.then(|| "test-key".to_string());
    config.resolver.tier1.email = Some("ops@example.com".to_string());
    config.resolver.tier1.min_rows = 1;
    config.resolver.tier2.base_url = format!("{upstream}/climatology");
    config.import.max_batch_rows = 500;
    config
}

/// Assemble the production router around `pool` and `config`
pub fn build_app(pool: PgPool, config: &Config) -> Router {
    let http = reqwest::Client::new();
    let orchestrator = Orchestrator::new(
        Tier1Client::new(http.clone(), config.resolver.tier1.clone()),
        Tier2Client::new(http, config.resolver.tier2.clone()),
        Tier3Grid::new(pool.clone(), config.resolver.tier3.clone()),
        PgCoordinateCache::new(pool.clone()),
        Duration::from_secs(config.resolver.tier_timeout_secs),
    );

    api::create_router(
        AppState {
            db: pool,
            orchestrator: Arc::new(orchestrator),
        },
        config,
    )
}

/// Send a request as the test caller and decode the JSON body
pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_as(app, Some(TEST_CALLER), method, uri, body).await
}

pub async fn call_as(
    app: &Router,
    caller: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    use tower::ServiceExt;

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header(USER_ID_HEADER, caller);
    }

    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Climatology payload with monthly GHI `ghi_base + 0.1 * (month - 1)`
pub fn climatology_payload(ghi_base: f64, dhi: f64) -> String {
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];

    let mut ghi_table = Map::new();
    let mut dhi_table = Map::new();
    for (idx, month) in MONTHS.iter().enumerate() {
        ghi_table.insert((*month).to_string(), json!(ghi_base + idx as f64 * 0.1));
        dhi_table.insert((*month).to_string(), json!(dhi));
    }
    ghi_table.insert("ANN".to_string(), json!(ghi_base + 0.55));
    dhi_table.insert("ANN".to_string(), json!(dhi));

    json!({
        "type": "Feature",
        "properties": {"parameter": {
            "ALLSKY_SFC_SW_DWN": Value::Object(ghi_table),
            "ALLSKY_SFC_SW_DIFF": Value::Object(dhi_table)
        }}
    })
    .to_string()
}

/// Import a complete twelve-month point through the public import API
///
/// Returns the new version id.
pub async fn import_point(app: &Router, tag: &str, lat: f64, lon: f64, ghi: f64) -> String {
    let (status, opened) = call(
        app,
        "POST",
        "/api/v1/imports",
        Some(json!({"action": "init", "dataset_code": "reference", "version_tag": tag})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "init failed: {opened}");
    let version_id = opened["version_id"].as_str().unwrap().to_string();
    let dataset_id = opened["dataset_id"].as_str().unwrap().to_string();

    let rows: Vec<Value> = (1..=12)
        .map(|m| json!({"lat": lat, "lon": lon, "month": m, "ghi": ghi, "dhi": 1.5}))
        .collect();
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/imports",
        Some(json!({"action": "batch", "version_id": version_id, "rows": rows})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "batch failed: {body}");

    let (status, body) = call(
        app,
        "POST",
        "/api/v1/imports",
        Some(json!({
            "action": "finalize",
            "version_id": version_id,
            "dataset_id": dataset_id,
            "row_count": 12,
            "checksum": "0f1e2d3c4b5a",
            "has_dhi": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "finalize failed: {body}");

    version_id
}
