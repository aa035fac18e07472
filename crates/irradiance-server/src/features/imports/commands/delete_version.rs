use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::{cache, datasets, points, versions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteVersionCommand {
    pub dataset_code: String,
    pub version_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteVersionResponse {
    /// Point rows removed
    pub deleted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteVersionError {
    #[error("Dataset code and version tag are required")]
    MissingIdentifier,
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),
    #[error("Version '{1}' of dataset '{0}' not found")]
    VersionNotFound(String, String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DeleteVersionCommand {
    pub fn validate(&self) -> Result<(), DeleteVersionError> {
        if self.dataset_code.trim().is_empty() || self.version_tag.trim().is_empty() {
            return Err(DeleteVersionError::MissingIdentifier);
        }
        Ok(())
    }
}

/// Remove a version whatever its status, with its points and cache rows.
#[tracing::instrument(skip(pool, command), fields(dataset = %command.dataset_code, tag = %command.version_tag))]
pub async fn handle(
    pool: PgPool,
    command: DeleteVersionCommand,
) -> Result<DeleteVersionResponse, DeleteVersionError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let dataset = datasets::find_by_code(&mut *tx, &command.dataset_code)
        .await?
        .ok_or_else(|| DeleteVersionError::DatasetNotFound(command.dataset_code.clone()))?;

    let version = versions::lock_by_tag(&mut *tx, dataset.id, &command.version_tag)
        .await?
        .ok_or_else(|| {
            DeleteVersionError::VersionNotFound(command.dataset_code.clone(), command.version_tag.clone())
        })?;

    let deleted = points::delete_for_version(&mut *tx, version.id).await?;
    let cache_rows = cache::delete_for_version(&mut *tx, version.id).await?;
    versions::delete(&mut *tx, version.id).await?;

    tx.commit().await?;

    tracing::info!(
        version_id = %version.id,
        status = %version.status,
        deleted,
        cache_rows,
        "Version deleted"
    );

    Ok(DeleteVersionResponse { deleted })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::features::imports::commands::init::{self, InitCommand};

    fn command(tag: &str) -> DeleteVersionCommand {
        DeleteVersionCommand {
            dataset_code: "reference".to_string(),
            version_tag: tag.to_string(),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_deletes_version_and_points(pool: PgPool) {
        let opened = init::handle(
            pool.clone(),
            InitCommand {
                dataset_code: "reference".to_string(),
                version_tag: "old".to_string(),
                source_note: None,
                file_names: vec![],
            },
        )
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO irradiance_points (version_id, lat, lon, month, ghi, dhi) \
             SELECT $1, 0, 0, m, 5, 2 FROM generate_series(1, 12) AS m",
        )
        .bind(opened.version_id)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("UPDATE irradiance_dataset_versions SET status = 'deprecated' WHERE id = $1")
            .bind(opened.version_id)
            .execute(&pool)
            .await
            .unwrap();

        let response = handle(pool.clone(), command("old")).await.unwrap();
        assert_eq!(response.deleted, 12);
        assert!(versions::find_by_id(&pool, opened.version_id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_unknown_targets(pool: PgPool) {
        assert!(matches!(
            handle(pool.clone(), command("missing")).await,
            Err(DeleteVersionError::VersionNotFound(_, _))
        ));

        let mut unknown = command("v1");
        unknown.dataset_code = "nope".to_string();
        assert!(matches!(
            handle(pool.clone(), unknown).await,
            Err(DeleteVersionError::DatasetNotFound(_))
        ));

        assert!(matches!(
            handle(pool, command(" ")).await,
            Err(DeleteVersionError::MissingIdentifier)
        ));
    }
}
