use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{datasets, is_unique_violation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetCommand {
    pub code: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetResponse {
    pub dataset_id: Uuid,
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateDatasetError {
    #[error("Code must be 1-64 characters of lowercase letters, digits, '_' or '-'")]
    InvalidCode,
    #[error("Label must be between 1 and 256 characters")]
    LabelLength,
    #[error("Dataset with code '{0}' already exists")]
    DuplicateCode(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateDatasetCommand {
    pub fn validate(&self) -> Result<(), CreateDatasetError> {
        let code_ok = !self.code.is_empty()
            && self.code.len() <= 64
            && self
                .code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !code_ok {
            return Err(CreateDatasetError::InvalidCode);
        }
        let label = self.label.trim();
        if label.is_empty() || label.chars().count() > 256 {
            return Err(CreateDatasetError::LabelLength);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(code = %command.code))]
pub async fn handle(
    pool: PgPool,
    command: CreateDatasetCommand,
) -> Result<CreateDatasetResponse, CreateDatasetError> {
    command.validate()?;

    let dataset = datasets::insert(&pool, &command.code, command.label.trim(), command.description.as_deref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return CreateDatasetError::DuplicateCode(command.code.clone());
            }
            CreateDatasetError::Database(e)
        })?;

    tracing::info!(dataset_id = %dataset.id, "Dataset created");

    Ok(CreateDatasetResponse {
        dataset_id: dataset.id,
        code: dataset.code,
    })
}
