//! List every version of one dataset, newest first.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::{datasets, versions::DatasetVersion, versions::VERSION_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListVersionsQuery {
    pub dataset_code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListVersionsError {
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListVersionsQuery,
) -> Result<Vec<DatasetVersion>, ListVersionsError> {
    let dataset = datasets::find_by_code(&pool, &query.dataset_code)
        .await?
        .ok_or_else(|| ListVersionsError::DatasetNotFound(query.dataset_code.clone()))?;

    let versions = sqlx::query_as::<_, DatasetVersion>(&format!(
        r#"
        SELECT {VERSION_COLUMNS} FROM irradiance_dataset_versions
        WHERE dataset_id = $1
        ORDER BY created_at DESC, version_tag DESC
        "#
    ))
    .bind(dataset.id)
    .fetch_all(&pool)
    .await?;

    Ok(versions)
}
