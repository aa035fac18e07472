//! Ranked fallback over the three tiers.
//!
//! Tiers run strictly in order and the first success wins. Each attempt
//! checks coverage, then the cache, then calls the tier under a timeout.
//! Only when every tier fails does the caller see an error, and that error
//! carries the reason for each tier.

use async_trait::async_trait;
use irradiance_common::{annual_average, MonthlyValues, Tier};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::cache::{CoordinateCache, PgCoordinateCache};
use super::tier::{FailureKind, ResolveRequest, TierFailure, TierResolver, TierSeries};
use super::tier1::Tier1Client;
use super::tier2::Tier2Client;
use super::tier3::Tier3Grid;

/// The orchestrator the server runs with.
pub type AppOrchestrator = Orchestrator<Tier1Client, Tier2Client, Tier3Grid, PgCoordinateCache>;

/// Successful resolution, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub source: Tier,
    pub cache_hit: bool,
    pub series: MonthlyValues,
    pub dhi_series: MonthlyValues,
    pub point_lat: f64,
    pub point_lon: f64,
    pub distance_km: f64,
    pub annual_average: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_months: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<Uuid>,
}

impl Resolution {
    fn from_tier(source: Tier, cache_hit: bool, result: TierSeries) -> Self {
        Self {
            source,
            cache_hit,
            annual_average: annual_average(&result.series.ghi),
            series: result.series.ghi,
            dhi_series: result.series.dhi,
            point_lat: result.point_lat,
            point_lon: result.point_lon,
            distance_km: result.distance_km,
            missing_months: result.series.missing_months,
            version_id: result.version_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("all tiers failed: {}", summarize(.0))]
    Exhausted(Vec<TierFailure>),
}

fn summarize(failures: &[TierFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct Orchestrator<T1, T2, T3, C> {
    tier1: T1,
    tier2: T2,
    tier3: T3,
    cache: C,
    tier_timeout: Duration,
}

impl<T1, T2, T3, C> Orchestrator<T1, T2, T3, C>
where
    T1: TierResolver,
    T2: TierResolver,
    T3: TierResolver,
    C: CoordinateCache,
{
    pub fn new(tier1: T1, tier2: T2, tier3: T3, cache: C, tier_timeout: Duration) -> Self {
        Self {
            tier1,
            tier2,
            tier3,
            cache,
            tier_timeout,
        }
    }

    /// Walk the tiers in rank order and return the first answer.
    #[tracing::instrument(skip(self, request), fields(lat = request.coord.lat, lon = request.coord.lon))]
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let mut failures = Vec::with_capacity(3);

        for tier in Tier::ALL {
            match self.resolve_with(tier, request).await {
                Ok(resolution) => return Ok(resolution),
                Err(failure) => failures.push(failure),
            }
        }

        tracing::warn!(failures = %summarize(&failures), "every tier failed");
        Err(ResolveError::Exhausted(failures))
    }

    /// Resolve against a single tier, with the same caching rules.
    pub async fn resolve_with(
        &self,
        tier: Tier,
        request: &ResolveRequest,
    ) -> Result<Resolution, TierFailure> {
        let outcome = match tier {
            Tier::Tier1 => self.attempt(&self.tier1, request).await,
            Tier::Tier2 => self.attempt(&self.tier2, request).await,
            Tier::Tier3 => self.attempt(&self.tier3, request).await,
        };

        outcome.map_err(|kind| {
            log_failure(tier, &kind);
            TierFailure { tier, kind }
        })
    }

    async fn attempt<T: TierResolver>(
        &self,
        resolver: &T,
        request: &ResolveRequest,
    ) -> Result<Resolution, FailureKind> {
        let tier = resolver.tier();

        if !resolver.covers(&request.coord) {
            return Err(FailureKind::OutOfCoverage(format!(
                "({}, {}) is outside {tier} coverage",
                request.coord.lat, request.coord.lon
            )));
        }

        let key = resolver.cache_key(request).await?;

        if let Some(key) = &key {
            match self.cache.get(key).await {
                Ok(Some(cached)) => {
                    tracing::debug!(%tier, key = %key, "cache hit");
                    return Ok(Resolution::from_tier(tier, true, cached));
                },
                Ok(None) => {},
                Err(e) => tracing::warn!(%tier, key = %key, error = %e, "cache read failed"),
            }
        }

        let result = tokio::time::timeout(self.tier_timeout, resolver.resolve(request))
            .await
            .map_err(|_| FailureKind::Timeout(self.tier_timeout))??;

        if let Some(key) = &key {
            // A tier3 answer is only cacheable under the version that produced it.
            if key.version_id.is_none() || key.version_id == result.version_id {
                if let Err(e) = self.cache.put(key, &result).await {
                    tracing::warn!(%tier, key = %key, error = %e, "cache write failed");
                }
            }
        }

        tracing::info!(%tier, distance_km = result.distance_km, "resolved");
        Ok(Resolution::from_tier(tier, false, result))
    }
}

/// What the HTTP layer needs from an orchestrator
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError>;

    async fn resolve_with(&self, tier: Tier, request: &ResolveRequest) -> Result<Resolution, TierFailure>;
}

#[async_trait]
impl<T1, T2, T3, C> Resolver for Orchestrator<T1, T2, T3, C>
where
    T1: TierResolver + 'static,
    T2: TierResolver + 'static,
    T3: TierResolver + 'static,
    C: CoordinateCache + 'static,
{
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        Orchestrator::resolve(self, request).await
    }

    async fn resolve_with(&self, tier: Tier, request: &ResolveRequest) -> Result<Resolution, TierFailure> {
        Orchestrator::resolve_with(self, tier, request).await
    }
}

fn log_failure(tier: Tier, kind: &FailureKind) {
    match kind {
        FailureKind::OutOfCoverage(reason) => tracing::debug!(%tier, %reason, "tier skipped"),
        FailureKind::Internal(reason) => tracing::error!(%tier, %reason, "tier failed"),
        other => tracing::warn!(%tier, outcome = other.outcome(), reason = %other.reason(), "tier failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::features::resolve::cache::memory::MemoryCache;
    use irradiance_common::{CacheKey, Coordinate, MonthlySeries};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted tier for orchestration tests
    pub struct FakeTier {
        pub tier: Tier,
        pub covers: bool,
        pub outcome: Result<f64, FailureKind>,
        pub delay: Option<Duration>,
        pub version_id: Option<Uuid>,
        pub calls: AtomicUsize,
    }

    impl FakeTier {
        pub fn answering(tier: Tier, base: f64) -> Self {
            Self {
                tier,
                covers: true,
                outcome: Ok(base),
                delay: None,
                version_id: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(tier: Tier, kind: FailureKind) -> Self {
            Self {
                outcome: Err(kind),
                ..Self::answering(tier, 0.0)
            }
        }

        pub fn uncovered(tier: Tier) -> Self {
            Self {
                covers: false,
                ..Self::answering(tier, 1.0)
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TierResolver for FakeTier {
        fn tier(&self) -> Tier {
            self.tier
        }

        fn covers(&self, _coord: &Coordinate) -> bool {
            self.covers
        }

        async fn cache_key(&self, request: &ResolveRequest) -> Result<Option<CacheKey>, FailureKind> {
            Ok(match (self.tier, request.version_id) {
                (Tier::Tier3, Some(version_id)) => Some(CacheKey::versioned(request.coord, version_id)),
                (Tier::Tier3, None) => None,
                _ => Some(CacheKey::live(request.coord, self.tier)),
            })
        }

        async fn resolve(&self, request: &ResolveRequest) -> Result<TierSeries, FailureKind> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let base = self.outcome.clone()?;
            let series =
                MonthlySeries::from_months((1u8..=12).map(|m| (m, base + f64::from(m) / 100.0, base / 2.0)))
                    .unwrap();
            Ok(TierSeries {
                version_id: self.version_id,
                ..TierSeries::at_query_point(request.coord, series)
            })
        }
    }

    fn orchestrator(
        t1: FakeTier,
        t2: FakeTier,
        t3: FakeTier,
    ) -> Orchestrator<FakeTier, FakeTier, FakeTier, MemoryCache> {
        Orchestrator::new(t1, t2, t3, MemoryCache::default(), Duration::from_secs(25))
    }

    fn at(lat: f64, lon: f64) -> ResolveRequest {
        ResolveRequest::at(Coordinate::new(lat, lon).unwrap())
    }

    #[tokio::test]
    async fn test_first_tier_wins_and_others_untouched() {
        let o = orchestrator(
            FakeTier::answering(Tier::Tier1, 5.0),
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
        );

        let resolution = o.resolve(&at(-15.0, -47.0)).await.unwrap();
        assert_eq!(resolution.source, Tier::Tier1);
        assert!(!resolution.cache_hit);
        assert_eq!(o.tier2.calls(), 0);
        assert_eq!(o.tier3.calls(), 0);
    }

    #[tokio::test]
    async fn test_uncovered_tier_is_never_called() {
        let o = orchestrator(
            FakeTier::uncovered(Tier::Tier1),
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
        );

        let resolution = o.resolve(&at(48.85, 2.35)).await.unwrap();
        assert_eq!(resolution.source, Tier::Tier2);
        assert_eq!(o.tier1.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_call_is_cache_hit_with_same_series() {
        let o = orchestrator(
            FakeTier::failing(Tier::Tier1, FailureKind::Upstream("HTTP 500".into())),
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
        );

        let first = o.resolve(&at(10.0, 20.0)).await.unwrap();
        let second = o.resolve(&at(10.0, 20.0)).await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(second.source, Tier::Tier2);
        assert_eq!(first.series, second.series);
        assert_eq!(first.dhi_series, second.dhi_series);
        assert_eq!(o.tier2.calls(), 1);
    }

    #[tokio::test]
    async fn test_coordinates_equal_to_four_decimals_share_entry() {
        let o = orchestrator(
            FakeTier::uncovered(Tier::Tier1),
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
        );

        o.resolve(&at(10.12341, 20.0)).await.unwrap();
        let second = o.resolve(&at(10.12346, 20.0)).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(o.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_lists_every_tier() {
        let o = orchestrator(
            FakeTier::uncovered(Tier::Tier1),
            FakeTier::failing(Tier::Tier2, FailureKind::Upstream("HTTP 503".into())),
            FakeTier::failing(Tier::Tier3, FailureKind::NotFound("no active version".into())),
        );

        let ResolveError::Exhausted(failures) = o.resolve(&at(0.0, 0.0)).await.unwrap_err();
        let outcomes: Vec<_> = failures.iter().map(|f| (f.tier, f.kind.outcome())).collect();
        assert_eq!(
            outcomes,
            vec![
                (Tier::Tier1, "out_of_coverage"),
                (Tier::Tier2, "upstream_error"),
                (Tier::Tier3, "not_found"),
            ]
        );

        let message = ResolveError::Exhausted(failures).to_string();
        assert!(message.contains("tier1") && message.contains("tier2") && message.contains("tier3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tier_times_out_and_falls_through() {
        let slow = FakeTier {
            delay: Some(Duration::from_secs(60)),
            ..FakeTier::answering(Tier::Tier1, 5.0)
        };
        let o = orchestrator(
            slow,
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
        );

        let resolution = o.resolve(&at(-15.0, -47.0)).await.unwrap();
        assert_eq!(resolution.source, Tier::Tier2);

        let failure = o.resolve_with(Tier::Tier1, &at(-16.0, -47.0)).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout(Duration::from_secs(25)));
    }

    #[tokio::test]
    async fn test_annual_average_matches_series() {
        let o = orchestrator(
            FakeTier::answering(Tier::Tier1, 5.0),
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
        );

        let resolution = o.resolve(&at(-15.0, -47.0)).await.unwrap();
        assert_eq!(resolution.annual_average, annual_average(&resolution.series));
        assert_eq!(resolution.annual_average, 5.065);
    }

    #[tokio::test]
    async fn test_failed_cache_write_does_not_fail_request() {
        let o = Orchestrator::new(
            FakeTier::answering(Tier::Tier1, 5.0),
            FakeTier::answering(Tier::Tier2, 4.0),
            FakeTier::answering(Tier::Tier3, 3.0),
            MemoryCache::read_only(),
            Duration::from_secs(25),
        );

        let resolution = o.resolve(&at(-15.0, -47.0)).await.unwrap();
        assert_eq!(resolution.source, Tier::Tier1);
    }

    #[tokio::test]
    async fn test_tier3_cached_only_under_matching_version() {
        let active = Uuid::new_v4();
        let grid = FakeTier {
            version_id: Some(active),
            ..FakeTier::answering(Tier::Tier3, 3.0)
        };
        let o = orchestrator(
            FakeTier::uncovered(Tier::Tier1),
            FakeTier::failing(Tier::Tier2, FailureKind::Upstream("down".into())),
            grid,
        );

        o.resolve(&at(1.0, 1.0)).await.unwrap();
        assert_eq!(o.cache.len(), 0);

        let stale = ResolveRequest {
            version_id: Some(Uuid::new_v4()),
            ..at(1.0, 1.0)
        };
        o.resolve(&stale).await.unwrap();
        assert_eq!(o.cache.len(), 0);

        let pinned = ResolveRequest {
            version_id: Some(active),
            ..at(1.0, 1.0)
        };
        o.resolve(&pinned).await.unwrap();
        assert_eq!(o.cache.len(), 1);
        assert!(o.resolve(&pinned).await.unwrap().cache_hit);
    }
}
