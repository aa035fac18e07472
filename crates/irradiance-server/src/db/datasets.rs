//! Dataset rows: named families of reference grids.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Dataset {
    pub id: Uuid,
    pub code: String,
    pub label: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const DATASET_COLUMNS: &str = "id, code, label, description, created_at, updated_at";

pub async fn find_by_code<'e>(
    executor: impl PgExecutor<'e>,
    code: &str,
) -> sqlx::Result<Option<Dataset>> {
    sqlx::query_as::<_, Dataset>(&format!(
        "SELECT {DATASET_COLUMNS} FROM irradiance_datasets WHERE code = $1"
    ))
    .bind(code)
    .fetch_optional(executor)
    .await
}

/// Lock the dataset row until the surrounding transaction ends.
///
/// Promotions of the same dataset serialize on this lock.
pub async fn lock_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Dataset>> {
    sqlx::query_as::<_, Dataset>(&format!(
        "SELECT {DATASET_COLUMNS} FROM irradiance_datasets WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    code: &str,
    label: &str,
    description: Option<&str>,
) -> sqlx::Result<Dataset> {
    sqlx::query_as::<_, Dataset>(&format!(
        r#"
        INSERT INTO irradiance_datasets (code, label, description)
        VALUES ($1, $2, $3)
        RETURNING {DATASET_COLUMNS}
        "#
    ))
    .bind(code)
    .bind(label)
    .bind(description)
    .fetch_one(executor)
    .await
}
