//! Coordinate cache rows.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CacheRow {
    pub cache_key: String,
    pub lat_e4: i32,
    pub lon_e4: i32,
    pub method: String,
    pub version_id: Option<Uuid>,
    pub ghi: Vec<f64>,
    pub dhi: Vec<f64>,
    pub missing_months: Vec<i16>,
    pub point_lat: f64,
    pub point_lon: f64,
    pub distance_km: f64,
    pub hit_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_hit_at: Option<DateTime<Utc>>,
}

/// Fetch an entry and count the hit in one statement.
pub async fn record_hit<'e>(
    executor: impl PgExecutor<'e>,
    cache_key: &str,
) -> sqlx::Result<Option<CacheRow>> {
    sqlx::query_as::<_, CacheRow>(
        r#"
        UPDATE irradiance_cache
        SET hit_count = hit_count + 1, last_hit_at = NOW()
        WHERE cache_key = $1
        RETURNING cache_key, lat_e4, lon_e4, method, version_id, ghi, dhi, missing_months,
                  point_lat, point_lon, distance_km, hit_count, created_at, last_hit_at
        "#,
    )
    .bind(cache_key)
    .fetch_optional(executor)
    .await
}

/// Insert or refresh an entry. `hit_count` and `created_at` survive a refresh.
pub async fn upsert<'e>(executor: impl PgExecutor<'e>, row: &CacheRow) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO irradiance_cache (
            cache_key, lat_e4, lon_e4, method, version_id, ghi, dhi, missing_months,
            point_lat, point_lon, distance_km
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (cache_key) DO UPDATE SET
            ghi = EXCLUDED.ghi,
            dhi = EXCLUDED.dhi,
            missing_months = EXCLUDED.missing_months,
            point_lat = EXCLUDED.point_lat,
            point_lon = EXCLUDED.point_lon,
            distance_km = EXCLUDED.distance_km
        "#,
    )
    .bind(&row.cache_key)
    .bind(row.lat_e4)
    .bind(row.lon_e4)
    .bind(&row.method)
    .bind(row.version_id)
    .bind(&row.ghi)
    .bind(&row.dhi)
    .bind(&row.missing_months)
    .bind(row.point_lat)
    .bind(row.point_lon)
    .bind(row.distance_km)
    .execute(executor)
    .await?;
    Ok(())
}

/// Drop entries produced by deprecated versions of a dataset.
pub async fn purge_deprecated<'e>(executor: impl PgExecutor<'e>, dataset_id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM irradiance_cache c
        USING irradiance_dataset_versions v
        WHERE c.version_id = v.id
          AND v.dataset_id = $1
          AND v.status = 'deprecated'
        "#,
    )
    .bind(dataset_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_for_version<'e>(executor: impl PgExecutor<'e>, version_id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM irradiance_cache WHERE version_id = $1")
        .bind(version_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
