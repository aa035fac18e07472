//! Coordinate cache in front of the tiers.

use async_trait::async_trait;
use chrono::Utc;
use irradiance_common::{CacheKey, MonthlySeries, MonthlyValues};
use sqlx::PgPool;
use thiserror::Error;

use super::tier::TierSeries;
use crate::db::cache::{self, CacheRow};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

#[async_trait]
pub trait CoordinateCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<TierSeries>, CacheError>;

    async fn put(&self, key: &CacheKey, value: &TierSeries) -> Result<(), CacheError>;
}

/// Cache backed by the `irradiance_cache` table
#[derive(Clone)]
pub struct PgCoordinateCache {
    pool: PgPool,
}

impl PgCoordinateCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_series(row: CacheRow) -> Result<TierSeries, CacheError> {
    let corrupt = |reason: String| CacheError::Corrupt {
        key: row.cache_key.clone(),
        reason,
    };

    let ghi = MonthlyValues::from_slice(&row.ghi).map_err(|e| corrupt(e.to_string()))?;
    let dhi = MonthlyValues::from_slice(&row.dhi).map_err(|e| corrupt(e.to_string()))?;
    let missing_months = row
        .missing_months
        .iter()
        .map(|&m| u8::try_from(m).map_err(|_| corrupt(format!("month {m} out of range"))))
        .collect::<Result<Vec<u8>, _>>()?;

    Ok(TierSeries {
        series: MonthlySeries {
            ghi,
            dhi,
            missing_months,
        },
        point_lat: row.point_lat,
        point_lon: row.point_lon,
        distance_km: row.distance_km,
        version_id: row.version_id,
    })
}

#[async_trait]
impl CoordinateCache for PgCoordinateCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<TierSeries>, CacheError> {
        cache::record_hit(&self.pool, &key.storage_key())
            .await?
            .map(row_to_series)
            .transpose()
    }

    async fn put(&self, key: &CacheKey, value: &TierSeries) -> Result<(), CacheError> {
        let row = CacheRow {
            cache_key: key.storage_key(),
            lat_e4: key.lat_e4,
            lon_e4: key.lon_e4,
            method: key.method.as_str().to_string(),
            version_id: key.version_id,
            ghi: value.series.ghi.to_vec(),
            dhi: value.series.dhi.to_vec(),
            missing_months: value.series.missing_months.iter().map(|&m| i16::from(m)).collect(),
            point_lat: value.point_lat,
            point_lon: value.point_lon,
            distance_km: value.distance_km,
            hit_count: 0,
            created_at: Utc::now(),
            last_hit_at: None,
        };

        cache::upsert(&self.pool, &row).await?;
        Ok(())
    }
}
