use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{points, versions, versions::VersionStatus};

/// Recorded when the caller gives no reason.
const DEFAULT_ABORT_REASON: &str = "aborted by operator";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortCommand {
    pub version_id: Uuid,
    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortResponse {
    pub success: bool,
    pub deleted_points: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AbortError {
    #[error("Version '{0}' not found")]
    VersionNotFound(Uuid),
    #[error("Version '{0}' is {1} and cannot be aborted")]
    NotAbortable(Uuid, VersionStatus),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Mark a `processing` version failed and drop its points.
///
/// Aborting a version that already failed succeeds without changes.
#[tracing::instrument(skip(pool, command), fields(version_id = %command.version_id))]
pub async fn handle(pool: PgPool, command: AbortCommand) -> Result<AbortResponse, AbortError> {
    let mut tx = pool.begin().await?;

    let version = versions::lock_for_update(&mut *tx, command.version_id)
        .await?
        .ok_or(AbortError::VersionNotFound(command.version_id))?;

    match version.status {
        VersionStatus::Failed => {
            tracing::debug!("Version already failed");
            return Ok(AbortResponse {
                success: true,
                deleted_points: 0,
            });
        },
        VersionStatus::Active | VersionStatus::Deprecated => {
            return Err(AbortError::NotAbortable(version.id, version.status));
        },
        VersionStatus::Processing => {},
    }

    let reason = command
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_ABORT_REASON);

    sqlx::query(
        r#"
        UPDATE irradiance_dataset_versions
        SET status = 'failed', error_message = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(version.id)
    .bind(reason)
    .execute(&mut *tx)
    .await?;

    let deleted_points = points::delete_for_version(&mut *tx, version.id).await?;

    tx.commit().await?;

    tracing::info!(deleted_points, %reason, "Import aborted");

    Ok(AbortResponse {
        success: true,
        deleted_points,
    })
}
