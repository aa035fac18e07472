//! Middleware for the irradiance server
//!
//! - CORS (Cross-Origin Resource Sharing)
//! - Request logging with tracing
//! - Caller gate for `/api/v1`

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{AuthConfig, CorsConfig};
use crate::error::AppError;

/// Header carrying the caller identity resolved by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    let wildcard =
        config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*");

    if wildcard {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // tower-http rejects credentials combined with a wildcard origin.
    if config.allow_credentials && !wildcard {
        cors = cors.allow_credentials(true);
    }

    cors
}

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

/// Caller identity from request headers, if any
pub fn caller_identity(headers: &HeaderMap) -> Option<String> {
    let non_empty = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(USER_ID_HEADER).or_else(|| non_empty(header::AUTHORIZATION.as_str()))
}

/// Reject requests that carry no caller identity
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_caller(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    if !auth.required {
        return next.run(request).await;
    }

    match caller_identity(request.headers()) {
        Some(caller) => {
            tracing::debug!(caller = %caller, path = %request.uri().path(), "Caller accepted");
            next.run(request).await
        },
        None => {
            tracing::debug!(path = %request.uri().path(), "Rejected request without caller");
            AppError::Unauthorized("authentication required".to_string()).into_response()
        },
    }
}
