use crate::api::response::{AttemptReport, ErrorResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use irradiance_common::{Coordinate, IrradianceError, Tier};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::orchestrator::{ResolveError, Resolver};
use super::tier::{FailureKind, ResolveRequest, TierFailure};

pub fn resolve_routes<R: Resolver>() -> Router<Arc<R>> {
    Router::new()
        .route("/resolve", post(resolve::<R>))
        .route("/tier1", post(resolve_tier1::<R>))
        .route("/tier2", post(resolve_tier2::<R>))
        .route("/tier3", post(resolve_tier3::<R>))
}

/// Request body shared by every resolution endpoint
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub version_id: Option<Uuid>,
    pub dataset: Option<String>,
}

impl ResolveBody {
    fn into_request(self) -> Result<ResolveRequest, ResolveApiError> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(ResolveApiError::MissingCoordinate);
        };

        Ok(ResolveRequest {
            coord: Coordinate::new(lat, lon)?,
            dataset: self.dataset,
            version_id: self.version_id,
        })
    }
}

fn parse(payload: Result<Json<ResolveBody>, JsonRejection>) -> Result<ResolveRequest, ResolveApiError> {
    let Json(body) = payload.map_err(|e| ResolveApiError::InvalidBody(e.body_text()))?;
    body.into_request()
}

#[tracing::instrument(skip(resolver, payload))]
async fn resolve<R: Resolver>(
    State(resolver): State<Arc<R>>,
    payload: Result<Json<ResolveBody>, JsonRejection>,
) -> Result<Response, ResolveApiError> {
    let request = parse(payload)?;
    let resolution = resolver.resolve(&request).await?;

    tracing::debug!(
        source = %resolution.source,
        cache_hit = resolution.cache_hit,
        "Coordinate resolved via API"
    );

    Ok((StatusCode::OK, Json(resolution)).into_response())
}

async fn resolve_single<R: Resolver>(
    tier: Tier,
    resolver: &R,
    payload: Result<Json<ResolveBody>, JsonRejection>,
) -> Result<Response, ResolveApiError> {
    let request = parse(payload)?;
    let resolution = resolver.resolve_with(tier, &request).await?;
    Ok((StatusCode::OK, Json(resolution)).into_response())
}

async fn resolve_tier1<R: Resolver>(
    State(resolver): State<Arc<R>>,
    payload: Result<Json<ResolveBody>, JsonRejection>,
) -> Result<Response, ResolveApiError> {
    resolve_single(Tier::Tier1, resolver.as_ref(), payload).await
}

async fn resolve_tier2<R: Resolver>(
    State(resolver): State<Arc<R>>,
    payload: Result<Json<ResolveBody>, JsonRejection>,
) -> Result<Response, ResolveApiError> {
    resolve_single(Tier::Tier2, resolver.as_ref(), payload).await
}

async fn resolve_tier3<R: Resolver>(
    State(resolver): State<Arc<R>>,
    payload: Result<Json<ResolveBody>, JsonRejection>,
) -> Result<Response, ResolveApiError> {
    resolve_single(Tier::Tier3, resolver.as_ref(), payload).await
}

#[derive(Debug)]
enum ResolveApiError {
    InvalidBody(String),
    MissingCoordinate,
    InvalidCoordinate(IrradianceError),
    Tier(TierFailure),
    Exhausted(ResolveError),
}

impl From<IrradianceError> for ResolveApiError {
    fn from(err: IrradianceError) -> Self {
        Self::InvalidCoordinate(err)
    }
}

impl From<TierFailure> for ResolveApiError {
    fn from(failure: TierFailure) -> Self {
        Self::Tier(failure)
    }
}

impl From<ResolveError> for ResolveApiError {
    fn from(err: ResolveError) -> Self {
        Self::Exhausted(err)
    }
}

impl IntoResponse for ResolveApiError {
    fn into_response(self) -> Response {
        match self {
            ResolveApiError::InvalidBody(_)
            | ResolveApiError::MissingCoordinate
            | ResolveApiError::InvalidCoordinate(_) => {
                ErrorResponse::new("VALIDATION_ERROR", self.to_string())
                    .into_response_with(StatusCode::BAD_REQUEST)
            },
            ResolveApiError::Tier(ref failure) => {
                let (status, code) = match failure.kind {
                    FailureKind::OutOfCoverage(_) => (StatusCode::NOT_FOUND, "OUT_OF_COVERAGE"),
                    FailureKind::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    FailureKind::Upstream(_)
                    | FailureKind::Timeout(_)
                    | FailureKind::EmptyResult(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
                    FailureKind::Internal(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    },
                };
                ErrorResponse::new(code, self.to_string()).into_response_with(status)
            },
            ResolveApiError::Exhausted(ResolveError::Exhausted(ref failures)) => {
                let attempts = failures
                    .iter()
                    .map(|f| AttemptReport {
                        tier: f.tier.to_string(),
                        outcome: f.kind.outcome().to_string(),
                        reason: f.kind.reason(),
                    })
                    .collect();
                ErrorResponse::with_attempts("ALL_TIERS_FAILED", self.to_string(), attempts)
                    .into_response_with(StatusCode::BAD_GATEWAY)
            },
        }
    }
}

impl std::fmt::Display for ResolveApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveApiError::InvalidBody(msg) => write!(f, "Invalid request body: {}", msg),
            ResolveApiError::MissingCoordinate => write!(f, "Both lat and lon are required"),
            ResolveApiError::InvalidCoordinate(e) => write!(f, "{}", e),
            ResolveApiError::Tier(failure) => write!(f, "{}", failure),
            ResolveApiError::Exhausted(e) => write!(f, "{}", e),
        }
    }
}
