//! Wire types shared with the irradiance server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope of read endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Error body every endpoint returns on failure
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// One reference grid row as posted in a `batch` action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub lat: f64,
    pub lon: f64,
    pub month: i64,
    pub ghi: f64,
    pub dhi: f64,
}

/// Import actions, tagged the way `POST /imports` expects
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ImportAction<'a> {
    Init {
        dataset_code: &'a str,
        version_tag: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        source_note: Option<&'a str>,
        file_names: Vec<String>,
    },
    Batch {
        version_id: Uuid,
        rows: &'a [ImportRow],
    },
    Finalize {
        version_id: Uuid,
        dataset_id: Uuid,
        row_count: i64,
        checksum: &'a str,
        has_dhi: bool,
    },
    Abort {
        version_id: Uuid,
        reason: &'a str,
    },
    DeleteVersion {
        dataset_code: &'a str,
        version_tag: &'a str,
    },
    Reclaim {
        #[serde(skip_serializing_if = "Option::is_none")]
        dataset_code: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stale_after_hours: Option<i64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitResponse {
    pub version_id: Uuid,
    pub dataset_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub inserted: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeResponse {
    pub version_id: Uuid,
    pub row_count: i64,
    #[serde(default)]
    pub demoted: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbortResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteVersionResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReclaimResponse {
    pub reclaimed_versions: u64,
    pub deleted_points: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveVersion {
    pub id: Uuid,
    pub version_tag: String,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSummary {
    pub id: Uuid,
    pub code: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version_count: i64,
    #[serde(default)]
    pub active_version: Option<ActiveVersion>,
}
