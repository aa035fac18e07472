use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_STALE_AFTER_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReclaimCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_after_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimResponse {
    pub reclaimed_versions: u64,
    pub deleted_points: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ReclaimError {
    #[error("stale_after_hours must be positive")]
    InvalidThreshold,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ReclaimCommand {
    pub fn validate(&self) -> Result<(), ReclaimError> {
        match self.stale_after_hours {
            Some(hours) if hours <= 0 => Err(ReclaimError::InvalidThreshold),
            _ => Ok(()),
        }
    }
}

/// Delete failed versions and `processing` versions nobody has written to
/// for `stale_after_hours`.
///
/// Rows locked by a running import are skipped.
#[tracing::instrument(skip(pool, command))]
pub async fn handle(pool: PgPool, command: ReclaimCommand) -> Result<ReclaimResponse, ReclaimError> {
    command.validate()?;
    let hours = command.stale_after_hours.unwrap_or(DEFAULT_STALE_AFTER_HOURS);

    let mut tx = pool.begin().await?;

    let orphaned = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT v.id
        FROM irradiance_dataset_versions v
        JOIN irradiance_datasets d ON d.id = v.dataset_id
        WHERE ($1::text IS NULL OR d.code = $1)
          AND (v.status = 'failed'
               OR (v.status = 'processing' AND v.updated_at < NOW() - make_interval(hours => $2::int)))
        FOR UPDATE OF v SKIP LOCKED
        "#,
    )
    .bind(command.dataset_code.as_deref())
    .bind(i32::try_from(hours).unwrap_or(i32::MAX))
    .fetch_all(&mut *tx)
    .await?;

    if orphaned.is_empty() {
        return Ok(ReclaimResponse {
            reclaimed_versions: 0,
            deleted_points: 0,
        });
    }

    let deleted_points = sqlx::query("DELETE FROM irradiance_points WHERE version_id = ANY($1)")
        .bind(&orphaned)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let reclaimed_versions = sqlx::query("DELETE FROM irradiance_dataset_versions WHERE id = ANY($1)")
        .bind(&orphaned)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    tracing::info!(reclaimed_versions, deleted_points, "Reclaimed orphaned versions");

    Ok(ReclaimResponse {
        reclaimed_versions,
        deleted_points,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::versions;

    async fn version(pool: &PgPool, tag: &str, status: &str, age_hours: i32) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO irradiance_dataset_versions (dataset_id, version_tag, status, updated_at)
            SELECT id, $1, $2, NOW() - make_interval(hours => $3)
            FROM irradiance_datasets WHERE code = 'reference'
            RETURNING id
            "#,
        )
        .bind(tag)
        .bind(status)
        .bind(age_hours)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[test]
    fn test_threshold_must_be_positive() {
        let cmd = ReclaimCommand {
            dataset_code: None,
            stale_after_hours: Some(0),
        };
        assert!(matches!(cmd.validate(), Err(ReclaimError::InvalidThreshold)));
        assert!(ReclaimCommand::default().validate().is_ok());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_reclaims_failed_and_stale_only(pool: PgPool) {
        let failed = version(&pool, "failed", "failed", 0).await;
        let stale = version(&pool, "stale", "processing", 48).await;
        let fresh = version(&pool, "fresh", "processing", 1).await;
        let active = version(&pool, "live", "active", 100).await;

        sqlx::query(
            "INSERT INTO irradiance_points (version_id, lat, lon, month, ghi, dhi) VALUES ($1, 0, 0, 1, 5, 2)",
        )
        .bind(stale)
        .execute(&pool)
        .await
        .unwrap();

        let response = handle(pool.clone(), ReclaimCommand::default()).await.unwrap();
        assert_eq!(response.reclaimed_versions, 2);
        assert_eq!(response.deleted_points, 1);

        assert!(versions::find_by_id(&pool, failed).await.unwrap().is_none());
        assert!(versions::find_by_id(&pool, stale).await.unwrap().is_none());
        assert!(versions::find_by_id(&pool, fresh).await.unwrap().is_some());
        assert!(versions::find_by_id(&pool, active).await.unwrap().is_some());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_dataset_filter(pool: PgPool) {
        version(&pool, "failed", "failed", 0).await;

        let other = ReclaimCommand {
            dataset_code: Some("other".to_string()),
            stale_after_hours: None,
        };
        let response = handle(pool.clone(), other).await.unwrap();
        assert_eq!(response.reclaimed_versions, 0);

        let reference = ReclaimCommand {
            dataset_code: Some("reference".to_string()),
            stale_after_hours: Some(1),
        };
        assert_eq!(handle(pool, reference).await.unwrap().reclaimed_versions, 1);
    }
}
