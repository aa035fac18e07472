//! Reference grid points. Append-only; removed only with their version.

use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

/// Bind parameters per inserted row: version_id, lat, lon, month, ghi, dhi.
pub const BINDS_PER_POINT: usize = 6;

/// Rows per multi-row `INSERT` statement, kept well under the 65535 bind limit.
pub const INSERT_CHUNK_ROWS: usize = 1000;

/// A validated point ready for insertion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPoint {
    pub lat: f64,
    pub lon: f64,
    pub month: i16,
    pub ghi: f64,
    pub dhi: f64,
}

/// One month of one grid point
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct PointMonth {
    pub month: i16,
    pub ghi: f64,
    pub dhi: f64,
}

/// Lat/lon rectangle restricting a nearest-point search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridWindow {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

fn insert_statement(version_id: Uuid, chunk: &[NewPoint]) -> QueryBuilder<'static, Postgres> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO irradiance_points (version_id, lat, lon, month, ghi, dhi) ");

    query_builder.push_values(chunk.iter(), |mut b, point| {
        b.push_bind(version_id)
            .push_bind(point.lat)
            .push_bind(point.lon)
            .push_bind(point.month)
            .push_bind(point.ghi)
            .push_bind(point.dhi);
    });

    query_builder
}

/// Insert points in chunks on one connection (normally a transaction).
pub async fn insert_batch(
    conn: &mut PgConnection,
    version_id: Uuid,
    points: &[NewPoint],
) -> sqlx::Result<u64> {
    let mut inserted = 0u64;

    for chunk in points.chunks(INSERT_CHUNK_ROWS) {
        let mut query_builder = insert_statement(version_id, chunk);
        let result = query_builder.build().execute(&mut *conn).await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

pub async fn count_for_version<'e>(executor: impl PgExecutor<'e>, version_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM irradiance_points WHERE version_id = $1")
        .bind(version_id)
        .fetch_one(executor)
        .await
}

pub async fn delete_for_version<'e>(executor: impl PgExecutor<'e>, version_id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM irradiance_points WHERE version_id = $1")
        .bind(version_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Nearest stored `(lat, lon)` by haversine, ties broken on lower lat then lower lon.
///
/// With a window only points inside it are considered; without one the whole
/// version is scanned.
pub async fn nearest<'e>(
    executor: impl PgExecutor<'e>,
    version_id: Uuid,
    lat: f64,
    lon: f64,
    window: Option<GridWindow>,
) -> sqlx::Result<Option<(f64, f64)>> {
    sqlx::query_as::<_, (f64, f64)>(
        r#"
        SELECT p.lat, p.lon
        FROM irradiance_points p
        WHERE p.version_id = $1
          AND ($4::float8 IS NULL OR (p.lat BETWEEN $4 AND $5 AND p.lon BETWEEN $6 AND $7))
        ORDER BY asin(least(1.0, sqrt(
                     power(sin(radians(p.lat - $2) / 2), 2)
                     + cos(radians($2)) * cos(radians(p.lat))
                       * power(sin(radians(p.lon - $3) / 2), 2)
                 ))),
                 p.lat,
                 p.lon
        LIMIT 1
        "#,
    )
    .bind(version_id)
    .bind(lat)
    .bind(lon)
    .bind(window.map(|w| w.min_lat))
    .bind(window.map(|w| w.max_lat))
    .bind(window.map(|w| w.min_lon))
    .bind(window.map(|w| w.max_lon))
    .fetch_optional(executor)
    .await
}

/// Every stored month at an exact grid point; the latest insert wins on duplicates.
pub async fn months_at<'e>(
    executor: impl PgExecutor<'e>,
    version_id: Uuid,
    lat: f64,
    lon: f64,
) -> sqlx::Result<Vec<PointMonth>> {
    sqlx::query_as::<_, PointMonth>(
        r#"
        SELECT month, ghi, dhi
        FROM irradiance_points
        WHERE version_id = $1 AND lat = $2 AND lon = $3
        ORDER BY month, id
        "#,
    )
    .bind(version_id)
    .bind(lat)
    .bind(lon)
    .fetch_all(executor)
    .await
}
