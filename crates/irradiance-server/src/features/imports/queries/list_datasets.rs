//! List datasets with the version currently serving lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Active version summary embedded in a dataset listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveVersionInfo {
    pub id: Uuid,
    pub version_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetListItem {
    pub id: Uuid,
    pub code: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_version: Option<ActiveVersionInfo>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListDatasetsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct DatasetRow {
    id: Uuid,
    code: String,
    label: String,
    description: Option<String>,
    version_count: i64,
    active_id: Option<Uuid>,
    active_tag: Option<String>,
    active_row_count: Option<i64>,
    active_activated_at: Option<DateTime<Utc>>,
}

impl From<DatasetRow> for DatasetListItem {
    fn from(row: DatasetRow) -> Self {
        let active_version = match (row.active_id, row.active_tag) {
            (Some(id), Some(version_tag)) => Some(ActiveVersionInfo {
                id,
                version_tag,
                row_count: row.active_row_count,
                activated_at: row.active_activated_at,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            code: row.code,
            label: row.label,
            description: row.description,
            version_count: row.version_count,
            active_version,
        }
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool) -> Result<Vec<DatasetListItem>, ListDatasetsError> {
    let rows = sqlx::query_as::<_, DatasetRow>(
        r#"
        SELECT d.id, d.code, d.label, d.description,
               (SELECT COUNT(*) FROM irradiance_dataset_versions c WHERE c.dataset_id = d.id) AS version_count,
               a.id AS active_id,
               a.version_tag AS active_tag,
               a.row_count AS active_row_count,
               a.activated_at AS active_activated_at
        FROM irradiance_datasets d
        LEFT JOIN irradiance_dataset_versions a
               ON a.dataset_id = d.id AND a.status = 'active'
        ORDER BY d.code
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(rows.into_iter().map(DatasetListItem::from).collect())
}
