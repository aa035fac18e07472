//! Tier 3: nearest point of the active version of a local reference grid.
//!
//! Distances are haversine on the mean Earth sphere. The nearest point is
//! searched in growing lat/lon windows around the query; a window answer is
//! only trusted when no point outside the window could be closer, otherwise
//! the search widens and finally scans the whole version.

use async_trait::async_trait;
use irradiance_common::geo::EARTH_RADIUS_KM;
use irradiance_common::{round_to, CacheKey, Coordinate, MonthlySeries, Tier};
use sqlx::PgPool;

use super::tier::{FailureKind, ResolveRequest, TierResolver, TierSeries};
use crate::config::Tier3Config;
use crate::db::points::{self, GridWindow};
use crate::db::versions::{self, DatasetVersion};

/// Half-widths (degrees) of the successive search windows.
pub const SEARCH_WINDOWS_DEG: [f64; 4] = [0.25, 1.0, 4.0, 16.0];

/// Window of half-width `half_width_deg` around a coordinate.
///
/// `None` when the window would cross the antimeridian; such queries go
/// straight to the next window or the full scan.
pub fn window_around(coord: &Coordinate, half_width_deg: f64) -> Option<GridWindow> {
    let min_lon = coord.lon - half_width_deg;
    let max_lon = coord.lon + half_width_deg;
    if min_lon < -180.0 || max_lon > 180.0 {
        return None;
    }

    Some(GridWindow {
        min_lat: (coord.lat - half_width_deg).max(-90.0),
        max_lat: (coord.lat + half_width_deg).min(90.0),
        min_lon,
        max_lon,
    })
}

/// Lower bound on the distance from the query to any point outside its window.
pub fn edge_distance_km(lat: f64, half_width_deg: f64) -> f64 {
    let half_width = half_width_deg.to_radians();
    let along_meridian = EARTH_RADIUS_KM * half_width;
    let to_meridian =
        EARTH_RADIUS_KM * (lat.to_radians().cos() * half_width.sin()).clamp(-1.0, 1.0).asin();
    along_meridian.min(to_meridian)
}

pub struct Tier3Grid {
    pool: PgPool,
    default_dataset: String,
}

impl Tier3Grid {
    pub fn new(pool: PgPool, config: Tier3Config) -> Self {
        Self {
            pool,
            default_dataset: config.default_dataset,
        }
    }

    fn dataset<'a>(&'a self, request: &'a ResolveRequest) -> &'a str {
        request
            .dataset
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .unwrap_or(&self.default_dataset)
    }

    async fn active_version(&self, dataset: &str) -> Result<DatasetVersion, FailureKind> {
        versions::active_for_dataset(&self.pool, dataset)
            .await
            .map_err(|e| FailureKind::Internal(format!("active version lookup failed: {e}")))?
            .ok_or_else(|| FailureKind::NotFound(format!("dataset '{dataset}' has no active version")))
    }

    async fn nearest_point(
        &self,
        version: &DatasetVersion,
        coord: &Coordinate,
    ) -> sqlx::Result<Option<Coordinate>> {
        for half_width in SEARCH_WINDOWS_DEG {
            let Some(window) = window_around(coord, half_width) else {
                continue;
            };

            let found = points::nearest(&self.pool, version.id, coord.lat, coord.lon, Some(window)).await?;
            if let Some((lat, lon)) = found {
                let point = Coordinate { lat, lon };
                if coord.distance_km(&point) <= edge_distance_km(coord.lat, half_width) {
                    return Ok(Some(point));
                }
            }
        }

        tracing::debug!(version_id = %version.id, "window search inconclusive, scanning version");
        let found = points::nearest(&self.pool, version.id, coord.lat, coord.lon, None).await?;
        Ok(found.map(|(lat, lon)| Coordinate { lat, lon }))
    }
}

#[async_trait]
impl TierResolver for Tier3Grid {
    fn tier(&self) -> Tier {
        Tier::Tier3
    }

    /// Only a caller pinned to the active version gets a cacheable answer.
    async fn cache_key(&self, request: &ResolveRequest) -> Result<Option<CacheKey>, FailureKind> {
        let Some(requested) = request.version_id else {
            return Ok(None);
        };

        let active = self.active_version(self.dataset(request)).await?;
        Ok((active.id == requested).then(|| CacheKey::versioned(request.coord, requested)))
    }

    #[tracing::instrument(skip(self, request), fields(lat = request.coord.lat, lon = request.coord.lon))]
    async fn resolve(&self, request: &ResolveRequest) -> Result<TierSeries, FailureKind> {
        let dataset = self.dataset(request);
        let version = self.active_version(dataset).await?;

        let point = self
            .nearest_point(&version, &request.coord)
            .await
            .map_err(|e| FailureKind::Internal(format!("nearest point search failed: {e}")))?
            .ok_or_else(|| {
                FailureKind::EmptyResult(format!(
                    "active version '{}' of '{dataset}' holds no points",
                    version.version_tag
                ))
            })?;

        let months = points::months_at(&self.pool, version.id, point.lat, point.lon)
            .await
            .map_err(|e| FailureKind::Internal(format!("grid point load failed: {e}")))?;

        let series = MonthlySeries::from_months(months.iter().filter_map(|row| {
            u8::try_from(row.month).ok().map(|month| (month, row.ghi, row.dhi))
        }))
        .map_err(|e| FailureKind::Internal(e.to_string()))?;

        Ok(TierSeries {
            series,
            point_lat: point.lat,
            point_lon: point.lon,
            distance_km: round_to(request.coord.distance_km(&point), 3),
            version_id: Some(version.id),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::points::NewPoint;
    use uuid::Uuid;

    fn grid(pool: PgPool) -> Tier3Grid {
        Tier3Grid::new(
            pool,
            Tier3Config {
                default_dataset: "reference".to_string(),
            },
        )
    }

    async fn active_version(pool: &PgPool, points: &[NewPoint]) -> Uuid {
        let version_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO irradiance_dataset_versions (dataset_id, version_tag, status, activated_at)
            SELECT id, 'grid-test', 'active', NOW() FROM irradiance_datasets WHERE code = 'reference'
            RETURNING id
            "#,
        )
        .fetch_one(pool)
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        points::insert_batch(&mut conn, version_id, points).await.unwrap();
        version_id
    }

    fn full_year(lat: f64, lon: f64) -> Vec<NewPoint> {
        (1..=12)
            .map(|month| NewPoint {
                lat,
                lon,
                month,
                ghi: 5.0 + f64::from(month) / 10.0,
                dhi: 2.0,
            })
            .collect()
    }

    #[test]
    fn test_window_skips_antimeridian() {
        let near_dateline = Coordinate::new(10.0, 179.9).unwrap();
        assert!(window_around(&near_dateline, 0.25).is_none());

        let window = window_around(&Coordinate::new(89.9, 0.0).unwrap(), 1.0).unwrap();
        assert_eq!(window.max_lat, 90.0);
        assert_eq!(window.min_lon, -1.0);
    }

    #[test]
    fn test_edge_distance_shrinks_with_latitude() {
        let equator = edge_distance_km(0.0, 1.0);
        let north = edge_distance_km(60.0, 1.0);
        assert!((equator - 111.195).abs() < 0.01);
        assert!(north < equator);
        assert!(north > 0.0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_snaps_to_nearest_grid_point(pool: PgPool) {
        let mut rows = full_year(-15.0, -47.0);
        rows.extend(full_year(-15.5, -47.5));
        let version_id = active_version(&pool, &rows).await;

        let request = ResolveRequest::at(Coordinate::new(-15.05, -47.02).unwrap());
        let result = grid(pool).resolve(&request).await.unwrap();

        assert_eq!((result.point_lat, result.point_lon), (-15.0, -47.0));
        assert_eq!(result.distance_km, 5.960);
        assert_eq!(result.version_id, Some(version_id));
        assert!(result.series.is_complete());
        assert_eq!(result.series.ghi.month(1), Some(5.1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_far_point_found_by_full_scan(pool: PgPool) {
        active_version(&pool, &full_year(40.0, 10.0)).await;

        let request = ResolveRequest::at(Coordinate::new(-30.0, -60.0).unwrap());
        let result = grid(pool).resolve(&request).await.unwrap();
        assert_eq!((result.point_lat, result.point_lon), (40.0, 10.0));
        assert!(result.distance_km > 9000.0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_partial_months_are_flagged(pool: PgPool) {
        let rows: Vec<NewPoint> = full_year(0.0, 0.0).into_iter().filter(|p| p.month != 7).collect();
        active_version(&pool, &rows).await;

        let request = ResolveRequest::at(Coordinate::new(0.0, 0.0).unwrap());
        let result = grid(pool).resolve(&request).await.unwrap();
        assert_eq!(result.series.missing_months, vec![7]);
        assert_eq!(result.series.ghi.month(7), Some(0.0));
        assert_eq!(result.distance_km, 0.0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_no_active_version_is_not_found(pool: PgPool) {
        let request = ResolveRequest::at(Coordinate::new(0.0, 0.0).unwrap());
        let err = grid(pool.clone()).resolve(&request).await.unwrap_err();
        assert_eq!(err.outcome(), "not_found");

        let unknown = ResolveRequest {
            dataset: Some("no-such-dataset".to_string()),
            ..ResolveRequest::at(Coordinate::new(0.0, 0.0).unwrap())
        };
        let err = grid(pool).resolve(&unknown).await.unwrap_err();
        assert_eq!(err.outcome(), "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_cache_key_only_for_active_version(pool: PgPool) {
        let version_id = active_version(&pool, &full_year(0.0, 0.0)).await;
        let tier = grid(pool);
        let coord = Coordinate::new(0.00001, 0.0).unwrap();

        assert_eq!(tier.cache_key(&ResolveRequest::at(coord)).await.unwrap(), None);

        let stale = ResolveRequest {
            version_id: Some(Uuid::new_v4()),
            ..ResolveRequest::at(coord)
        };
        assert_eq!(tier.cache_key(&stale).await.unwrap(), None);

        let pinned = ResolveRequest {
            version_id: Some(version_id),
            ..ResolveRequest::at(coord)
        };
        let key = tier.cache_key(&pinned).await.unwrap().unwrap();
        assert_eq!(key.storage_key(), format!("0:0:tier3:{version_id}"));
    }
}
