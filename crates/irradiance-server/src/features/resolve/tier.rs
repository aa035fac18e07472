//! The contract every ranked resolver tier implements.

use async_trait::async_trait;
use irradiance_common::{CacheKey, Coordinate, MonthlySeries, Tier};
use std::time::Duration;
use uuid::Uuid;

/// What the caller asked for
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub coord: Coordinate,
    /// Dataset for the local grid tier; the configured default when absent
    pub dataset: Option<String>,
    /// Version context supplied by bulk/offline callers
    pub version_id: Option<Uuid>,
}

impl ResolveRequest {
    pub fn at(coord: Coordinate) -> Self {
        Self {
            coord,
            dataset: None,
            version_id: None,
        }
    }
}

/// A monthly series as produced by one tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierSeries {
    pub series: MonthlySeries,
    pub point_lat: f64,
    pub point_lon: f64,
    pub distance_km: f64,
    /// Dataset version that produced the series (local grid only)
    pub version_id: Option<Uuid>,
}

impl TierSeries {
    /// Series the provider interpolated to the query point itself.
    pub fn at_query_point(coord: Coordinate, series: MonthlySeries) -> Self {
        Self {
            series,
            point_lat: coord.lat,
            point_lon: coord.lon,
            distance_km: 0.0,
            version_id: None,
        }
    }
}

/// Why a tier produced nothing
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    OutOfCoverage(String),
    Upstream(String),
    Timeout(Duration),
    EmptyResult(String),
    NotFound(String),
    Internal(String),
}

impl FailureKind {
    /// Stable machine-readable outcome label
    pub fn outcome(&self) -> &'static str {
        match self {
            FailureKind::OutOfCoverage(_) => "out_of_coverage",
            FailureKind::Upstream(_) => "upstream_error",
            FailureKind::Timeout(_) => "timeout",
            FailureKind::EmptyResult(_) => "empty_result",
            FailureKind::NotFound(_) => "not_found",
            FailureKind::Internal(_) => "internal_error",
        }
    }

    pub fn reason(&self) -> String {
        match self {
            FailureKind::OutOfCoverage(reason)
            | FailureKind::Upstream(reason)
            | FailureKind::EmptyResult(reason)
            | FailureKind::NotFound(reason)
            | FailureKind::Internal(reason) => reason.clone(),
            FailureKind::Timeout(after) => format!("no answer within {}s", after.as_secs()),
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.outcome(), self.reason())
    }
}

/// One failed attempt, tagged with its tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierFailure {
    pub tier: Tier,
    pub kind: FailureKind,
}

impl std::fmt::Display for TierFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.tier, self.kind)
    }
}

/// A ranked source of monthly irradiance
#[async_trait]
pub trait TierResolver: Send + Sync {
    fn tier(&self) -> Tier;

    /// Cheap precondition; a tier that does not cover the coordinate is never called.
    fn covers(&self, _coord: &Coordinate) -> bool {
        true
    }

    /// Cache key for this request, or `None` when the result must not be cached.
    async fn cache_key(&self, request: &ResolveRequest) -> Result<Option<CacheKey>, FailureKind> {
        Ok(Some(CacheKey::live(request.coord, self.tier())))
    }

    async fn resolve(&self, request: &ResolveRequest) -> Result<TierSeries, FailureKind>;
}
