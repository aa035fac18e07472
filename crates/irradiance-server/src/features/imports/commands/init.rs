use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::is_valid_version_tag;
use crate::db::{datasets, is_unique_violation, versions, versions::VersionStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitCommand {
    pub dataset_code: String,
    pub version_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_note: Option<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    pub version_id: Uuid,
    pub dataset_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Dataset code is required and cannot be empty")]
    DatasetCodeRequired,
    #[error("Version tag must be 1-64 characters of letters, digits, '.', '_' or '-'")]
    InvalidVersionTag,
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),
    #[error("Version '{0}' already exists; delete it before importing again")]
    VersionExists(String),
    #[error("Version '{0}' is already being imported")]
    VersionInProgress(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl InitCommand {
    pub fn validate(&self) -> Result<(), InitError> {
        if self.dataset_code.trim().is_empty() {
            return Err(InitError::DatasetCodeRequired);
        }
        if !is_valid_version_tag(&self.version_tag) {
            return Err(InitError::InvalidVersionTag);
        }
        Ok(())
    }
}

/// Open a new `processing` version.
///
/// A `failed` version with the same tag is purged first; any other existing
/// version with that tag blocks the import.
#[tracing::instrument(skip(pool, command), fields(dataset = %command.dataset_code, tag = %command.version_tag))]
pub async fn handle(pool: PgPool, command: InitCommand) -> Result<InitResponse, InitError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let dataset = datasets::find_by_code(&mut *tx, &command.dataset_code)
        .await?
        .ok_or_else(|| InitError::DatasetNotFound(command.dataset_code.clone()))?;

    if let Some(existing) = versions::lock_by_tag(&mut *tx, dataset.id, &command.version_tag).await? {
        match existing.status {
            VersionStatus::Active | VersionStatus::Deprecated => {
                return Err(InitError::VersionExists(command.version_tag));
            },
            VersionStatus::Processing => {
                return Err(InitError::VersionInProgress(command.version_tag));
            },
            VersionStatus::Failed => {
                versions::delete(&mut *tx, existing.id).await?;
                tracing::info!(version_id = %existing.id, "Purged failed version before re-import");
            },
        }
    }

    let version_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO irradiance_dataset_versions (dataset_id, version_tag, source_note, file_names)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(dataset.id)
    .bind(&command.version_tag)
    .bind(&command.source_note)
    .bind(&command.file_names)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return InitError::VersionInProgress(command.version_tag.clone());
        }
        InitError::Database(e)
    })?;

    tx.commit().await?;

    tracing::info!(%version_id, "Import version opened");

    Ok(InitResponse {
        version_id,
        dataset_id: dataset.id,
    })
}
