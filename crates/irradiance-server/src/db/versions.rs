//! Dataset version rows and their lifecycle status.
//!
//! A version moves `processing -> active | failed` exactly once, and an
//! `active` version becomes `deprecated` when a newer one is promoted. The
//! partial unique index `irradiance_dataset_versions_one_active` keeps at
//! most one `active` row per dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgExecutor;
use uuid::Uuid;

/// Lifecycle state of a dataset version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Processing,
    Active,
    Deprecated,
    Failed,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Processing => "processing",
            VersionStatus::Active => "active",
            VersionStatus::Deprecated => "deprecated",
            VersionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown version status '{0}'")]
pub struct UnknownStatus(String);

impl TryFrom<String> for VersionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "processing" => Ok(VersionStatus::Processing),
            "active" => Ok(VersionStatus::Active),
            "deprecated" => Ok(VersionStatus::Deprecated),
            "failed" => Ok(VersionStatus::Failed),
            _ => Err(UnknownStatus(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DatasetVersion {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub version_tag: String,
    #[sqlx(try_from = "String")]
    pub status: VersionStatus,
    pub row_count: Option<i64>,
    pub checksum: Option<String>,
    pub source_note: Option<String>,
    pub file_names: Vec<String>,
    pub metadata: JsonValue,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

pub(crate) const VERSION_COLUMNS: &str = "id, dataset_id, version_tag, status, row_count, \
     checksum, source_note, file_names, metadata, error_message, created_at, updated_at, \
     activated_at";

pub async fn find_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<DatasetVersion>> {
    sqlx::query_as::<_, DatasetVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM irradiance_dataset_versions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Fetch and row-lock a version for a state transition.
pub async fn lock_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<DatasetVersion>> {
    sqlx::query_as::<_, DatasetVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM irradiance_dataset_versions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Shared lock: concurrent batches proceed, finalize and abort wait.
pub async fn lock_for_share<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<DatasetVersion>> {
    sqlx::query_as::<_, DatasetVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM irradiance_dataset_versions WHERE id = $1 FOR SHARE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn lock_by_tag<'e>(
    executor: impl PgExecutor<'e>,
    dataset_id: Uuid,
    version_tag: &str,
) -> sqlx::Result<Option<DatasetVersion>> {
    sqlx::query_as::<_, DatasetVersion>(&format!(
        r#"
        SELECT {VERSION_COLUMNS} FROM irradiance_dataset_versions
        WHERE dataset_id = $1 AND version_tag = $2
        FOR UPDATE
        "#
    ))
    .bind(dataset_id)
    .bind(version_tag)
    .fetch_optional(executor)
    .await
}

/// The version currently serving lookups for a dataset code.
pub async fn active_for_dataset<'e>(
    executor: impl PgExecutor<'e>,
    dataset_code: &str,
) -> sqlx::Result<Option<DatasetVersion>> {
    sqlx::query_as::<_, DatasetVersion>(
        r#"
        SELECT v.id, v.dataset_id, v.version_tag, v.status, v.row_count, v.checksum,
               v.source_note, v.file_names, v.metadata, v.error_message, v.created_at,
               v.updated_at, v.activated_at
        FROM irradiance_dataset_versions v
        JOIN irradiance_datasets d ON d.id = v.dataset_id
        WHERE d.code = $1 AND v.status = 'active'
        "#,
    )
    .bind(dataset_code)
    .fetch_optional(executor)
    .await
}

/// Delete a version row; its points and cache rows go with it (cascade).
pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM irradiance_dataset_versions WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Bump `updated_at` on a version still being filled, so reclaim sees it as live.
pub async fn touch_processing<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE irradiance_dataset_versions SET updated_at = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}
