use irradiance_common::checksum::is_acceptable_checksum;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{cache, datasets, points, versions, versions::VersionStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeCommand {
    pub version_id: Uuid,
    pub dataset_id: Uuid,
    pub row_count: i64,
    pub checksum: String,
    #[serde(default)]
    pub has_dhi: bool,
    #[serde(default)]
    pub has_dni: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub version_id: Uuid,
    pub row_count: i64,
    /// Previously active versions now deprecated
    pub demoted: u64,
    pub cache_purged: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("Row count must be non-negative")]
    NegativeRowCount,
    #[error("Checksum must be non-empty and at most 128 characters")]
    InvalidChecksum,
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(Uuid),
    #[error("Version '{0}' not found")]
    VersionNotFound(Uuid),
    #[error("Version '{0}' does not belong to dataset '{1}'")]
    DatasetMismatch(Uuid, Uuid),
    #[error("Version '{0}' is {1}, only processing versions can be finalized")]
    NotProcessing(Uuid, VersionStatus),
    #[error("Version holds no rows")]
    EmptyVersion,
    #[error("Row count mismatch: expected {expected}, stored {stored}")]
    RowCountMismatch { expected: i64, stored: i64 },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl FinalizeError {
    /// Integrity failures leave the version in `processing`.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            FinalizeError::InvalidChecksum
                | FinalizeError::EmptyVersion
                | FinalizeError::RowCountMismatch { .. }
        )
    }
}

impl FinalizeCommand {
    pub fn validate(&self) -> Result<(), FinalizeError> {
        if self.row_count < 0 {
            return Err(FinalizeError::NegativeRowCount);
        }
        if !is_acceptable_checksum(&self.checksum) {
            return Err(FinalizeError::InvalidChecksum);
        }
        Ok(())
    }
}

/// Promote a `processing` version to `active` in one transaction.
///
/// The dataset row lock serializes concurrent promotions. Every other active
/// version of the dataset is deprecated and the cache rows they produced are
/// dropped before the commit.
#[tracing::instrument(skip(pool, command), fields(version_id = %command.version_id, row_count = command.row_count))]
pub async fn handle(pool: PgPool, command: FinalizeCommand) -> Result<FinalizeResponse, FinalizeError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    datasets::lock_for_update(&mut *tx, command.dataset_id)
        .await?
        .ok_or(FinalizeError::DatasetNotFound(command.dataset_id))?;

    let version = versions::lock_for_update(&mut *tx, command.version_id)
        .await?
        .ok_or(FinalizeError::VersionNotFound(command.version_id))?;

    if version.dataset_id != command.dataset_id {
        return Err(FinalizeError::DatasetMismatch(version.id, command.dataset_id));
    }
    if version.status != VersionStatus::Processing {
        return Err(FinalizeError::NotProcessing(version.id, version.status));
    }

    let stored = points::count_for_version(&mut *tx, version.id).await?;
    if stored == 0 {
        return Err(FinalizeError::EmptyVersion);
    }
    if stored != command.row_count {
        return Err(FinalizeError::RowCountMismatch {
            expected: command.row_count,
            stored,
        });
    }

    let demoted = sqlx::query(
        r#"
        UPDATE irradiance_dataset_versions
        SET status = 'deprecated', updated_at = NOW()
        WHERE dataset_id = $1 AND status = 'active' AND id <> $2
        "#,
    )
    .bind(command.dataset_id)
    .bind(version.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(
        r#"
        UPDATE irradiance_dataset_versions
        SET status = 'active',
            row_count = $2,
            checksum = $3,
            metadata = metadata || $4,
            activated_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(version.id)
    .bind(stored)
    .bind(&command.checksum)
    .bind(json!({ "has_dhi": command.has_dhi, "has_dni": command.has_dni }))
    .execute(&mut *tx)
    .await?;

    let cache_purged = cache::purge_deprecated(&mut *tx, command.dataset_id).await?;

    tx.commit().await?;

    tracing::info!(demoted, cache_purged, "Version promoted to active");

    Ok(FinalizeResponse {
        version_id: version.id,
        row_count: stored,
        demoted,
        cache_purged,
    })
}
