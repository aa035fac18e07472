use crate::api::response::{ApiResponse, ErrorResponse};
use crate::config::ImportConfig;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use super::{
    commands::{
        AbortCommand, AbortError, BatchCommand, BatchError, CreateDatasetCommand,
        CreateDatasetError, DeleteVersionCommand, DeleteVersionError, FinalizeCommand,
        FinalizeError, InitCommand, InitError, ReclaimCommand, ReclaimError,
    },
    queries::{ListDatasetsError, ListVersionsError, ListVersionsQuery},
};

/// State for the import endpoint
#[derive(Clone)]
pub struct ImportState {
    pub db: PgPool,
    pub config: ImportConfig,
}

pub fn imports_routes() -> Router<ImportState> {
    Router::new().route("/", post(dispatch_import))
}

pub fn datasets_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_datasets))
        .route("/:code/versions", get(list_versions))
}

/// Body of `POST /imports`, discriminated by `action`
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ImportRequest {
    Init(InitCommand),
    Batch(BatchCommand),
    Finalize(FinalizeCommand),
    Abort(AbortCommand),
    DeleteVersion(DeleteVersionCommand),
    CreateDataset(CreateDatasetCommand),
    Reclaim(ReclaimCommand),
}

impl ImportRequest {
    fn action(&self) -> &'static str {
        match self {
            ImportRequest::Init(_) => "init",
            ImportRequest::Batch(_) => "batch",
            ImportRequest::Finalize(_) => "finalize",
            ImportRequest::Abort(_) => "abort",
            ImportRequest::DeleteVersion(_) => "delete_version",
            ImportRequest::CreateDataset(_) => "create_dataset",
            ImportRequest::Reclaim(_) => "reclaim",
        }
    }
}

#[tracing::instrument(skip(state, payload))]
async fn dispatch_import(
    State(state): State<ImportState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Response, ImportApiError> {
    let Json(request) = payload.map_err(|e| ImportApiError::InvalidBody(e.body_text()))?;
    let action = request.action();
    let pool = state.db;

    let response = match request {
        ImportRequest::Init(command) => {
            (StatusCode::OK, Json(json!(super::commands::init::handle(pool, command).await?)))
        },
        ImportRequest::Batch(command) => {
            let max_rows = state.config.max_batch_rows;
            let response = super::commands::batch::handle(pool, command, max_rows).await?;
            (StatusCode::OK, Json(json!(response)))
        },
        ImportRequest::Finalize(command) => {
            (StatusCode::OK, Json(json!(super::commands::finalize::handle(pool, command).await?)))
        },
        ImportRequest::Abort(command) => {
            (StatusCode::OK, Json(json!(super::commands::abort::handle(pool, command).await?)))
        },
        ImportRequest::DeleteVersion(command) => {
            let response = super::commands::delete_version::handle(pool, command).await?;
            (StatusCode::OK, Json(json!(response)))
        },
        ImportRequest::CreateDataset(command) => {
            let response = super::commands::create_dataset::handle(pool, command).await?;
            (StatusCode::CREATED, Json(json!(response)))
        },
        ImportRequest::Reclaim(command) => {
            (StatusCode::OK, Json(json!(super::commands::reclaim::handle(pool, command).await?)))
        },
    };

    tracing::info!(action, "Import action completed via API");

    Ok(response.into_response())
}

#[tracing::instrument(skip(pool))]
async fn list_datasets(State(pool): State<PgPool>) -> Result<Response, ImportApiError> {
    let datasets = super::queries::list_datasets::handle(pool).await?;

    tracing::debug!(count = datasets.len(), "Datasets listed via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(datasets))).into_response())
}

#[tracing::instrument(skip(pool), fields(code = %code))]
async fn list_versions(
    State(pool): State<PgPool>,
    Path(code): Path<String>,
) -> Result<Response, ImportApiError> {
    let versions =
        super::queries::list_versions::handle(pool, ListVersionsQuery { dataset_code: code }).await?;

    let meta = json!({ "count": versions.len() });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(versions, meta))).into_response())
}

#[derive(Debug)]
enum ImportApiError {
    InvalidBody(String),
    Init(InitError),
    Batch(BatchError),
    Finalize(FinalizeError),
    Abort(AbortError),
    DeleteVersion(DeleteVersionError),
    CreateDataset(CreateDatasetError),
    Reclaim(ReclaimError),
    ListDatasets(ListDatasetsError),
    ListVersions(ListVersionsError),
}

impl From<InitError> for ImportApiError {
    fn from(err: InitError) -> Self {
        Self::Init(err)
    }
}

impl From<BatchError> for ImportApiError {
    fn from(err: BatchError) -> Self {
        Self::Batch(err)
    }
}

impl From<FinalizeError> for ImportApiError {
    fn from(err: FinalizeError) -> Self {
        Self::Finalize(err)
    }
}

impl From<AbortError> for ImportApiError {
    fn from(err: AbortError) -> Self {
        Self::Abort(err)
    }
}

impl From<DeleteVersionError> for ImportApiError {
    fn from(err: DeleteVersionError) -> Self {
        Self::DeleteVersion(err)
    }
}

impl From<CreateDatasetError> for ImportApiError {
    fn from(err: CreateDatasetError) -> Self {
        Self::CreateDataset(err)
    }
}

impl From<ReclaimError> for ImportApiError {
    fn from(err: ReclaimError) -> Self {
        Self::Reclaim(err)
    }
}

impl From<ListDatasetsError> for ImportApiError {
    fn from(err: ListDatasetsError) -> Self {
        Self::ListDatasets(err)
    }
}

impl From<ListVersionsError> for ImportApiError {
    fn from(err: ListVersionsError) -> Self {
        Self::ListVersions(err)
    }
}

const VALIDATION: (StatusCode, &str) = (StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "NOT_FOUND");
const CONFLICT: (StatusCode, &str) = (StatusCode::CONFLICT, "CONFLICT");
const INTEGRITY: (StatusCode, &str) = (StatusCode::UNPROCESSABLE_ENTITY, "INTEGRITY_ERROR");
const DATABASE: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR");

impl IntoResponse for ImportApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ImportApiError::InvalidBody(_) => VALIDATION,

            ImportApiError::Init(InitError::DatasetCodeRequired | InitError::InvalidVersionTag) => {
                VALIDATION
            },
            ImportApiError::Init(InitError::DatasetNotFound(_)) => NOT_FOUND,
            ImportApiError::Init(InitError::VersionExists(_) | InitError::VersionInProgress(_)) => {
                CONFLICT
            },
            ImportApiError::Init(InitError::Database(_)) => DATABASE,

            ImportApiError::Batch(BatchError::InvalidRow { .. } | BatchError::TooLarge(_, _)) => {
                VALIDATION
            },
            ImportApiError::Batch(BatchError::VersionNotFound(_)) => NOT_FOUND,
            ImportApiError::Batch(BatchError::NotProcessing(_, _)) => CONFLICT,
            ImportApiError::Batch(BatchError::Database(_)) => DATABASE,

            ImportApiError::Finalize(FinalizeError::NegativeRowCount) => VALIDATION,
            ImportApiError::Finalize(err) if err.is_integrity() => INTEGRITY,
            ImportApiError::Finalize(
                FinalizeError::DatasetNotFound(_) | FinalizeError::VersionNotFound(_),
            ) => NOT_FOUND,
            ImportApiError::Finalize(FinalizeError::Database(_)) => DATABASE,
            ImportApiError::Finalize(_) => CONFLICT,

            ImportApiError::Abort(AbortError::VersionNotFound(_)) => NOT_FOUND,
            ImportApiError::Abort(AbortError::NotAbortable(_, _)) => CONFLICT,
            ImportApiError::Abort(AbortError::Database(_)) => DATABASE,

            ImportApiError::DeleteVersion(DeleteVersionError::MissingIdentifier) => VALIDATION,
            ImportApiError::DeleteVersion(
                DeleteVersionError::DatasetNotFound(_) | DeleteVersionError::VersionNotFound(_, _),
            ) => NOT_FOUND,
            ImportApiError::DeleteVersion(DeleteVersionError::Database(_)) => DATABASE,

            ImportApiError::CreateDataset(
                CreateDatasetError::InvalidCode | CreateDatasetError::LabelLength,
            ) => VALIDATION,
            ImportApiError::CreateDataset(CreateDatasetError::DuplicateCode(_)) => CONFLICT,
            ImportApiError::CreateDataset(CreateDatasetError::Database(_)) => DATABASE,

            ImportApiError::Reclaim(ReclaimError::InvalidThreshold) => VALIDATION,
            ImportApiError::Reclaim(ReclaimError::Database(_)) => DATABASE,

            ImportApiError::ListDatasets(ListDatasetsError::Database(_)) => DATABASE,
            ImportApiError::ListVersions(ListVersionsError::DatasetNotFound(_)) => NOT_FOUND,
            ImportApiError::ListVersions(ListVersionsError::Database(_)) => DATABASE,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Database error during import action: {}", self);
            return ErrorResponse::new(code, "A database error occurred").into_response_with(status);
        }

        ErrorResponse::new(code, self.to_string()).into_response_with(status)
    }
}

impl std::fmt::Display for ImportApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportApiError::InvalidBody(msg) => write!(f, "Invalid import request: {}", msg),
            ImportApiError::Init(e) => write!(f, "{}", e),
            ImportApiError::Batch(e) => write!(f, "{}", e),
            ImportApiError::Finalize(e) => write!(f, "{}", e),
            ImportApiError::Abort(e) => write!(f, "{}", e),
            ImportApiError::DeleteVersion(e) => write!(f, "{}", e),
            ImportApiError::CreateDataset(e) => write!(f, "{}", e),
            ImportApiError::Reclaim(e) => write!(f, "{}", e),
            ImportApiError::ListDatasets(e) => write!(f, "{}", e),
            ImportApiError::ListVersions(e) => write!(f, "{}", e),
        }
    }
}
