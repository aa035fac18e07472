//! `irradiance import` command implementation
//!
//! Drives `init -> batch* -> finalize` for one reference CSV. Any failure
//! after `init` aborts the version so no partial data survives.

use crate::api::{
    AbortResponse, ApiClient, BatchResponse, FinalizeResponse, ImportAction, InitResponse,
};
use crate::error::{CliError, Result};
use crate::progress::{create_progress_bar, create_spinner};
use crate::reference::{count_rows, ReferenceReader};
use colored::Colorize;
use irradiance_common::checksum::{compute_file_checksum, verify_file_checksum};
use std::path::PathBuf;
use uuid::Uuid;

pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone)]
pub struct ImportArgs {
    pub file: PathBuf,
    pub dataset: String,
    pub tag: String,
    pub note: Option<String>,
    pub batch_size: usize,
    /// Refuse to import unless the file hashes to this digest
    pub expect_checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub version_id: Uuid,
    pub row_count: i64,
    pub checksum: String,
}

/// Import one reference file as a new dataset version
pub async fn run(client: &ApiClient, args: ImportArgs) -> Result<ImportSummary> {
    if args.batch_size == 0 {
        return Err(CliError::invalid_argument("--batch-size must be greater than 0"));
    }

    let spinner = create_spinner(&format!("Hashing {}", args.file.display()));
    if let Some(ref expected) = args.expect_checksum {
        verify_file_checksum(&args.file, expected)?;
    }
    let checksum = compute_file_checksum(&args.file)?;
    let total = count_rows(&args.file)?;
    spinner.finish_and_clear();

    if total == 0 {
        return Err(CliError::EmptyFile(args.file.display().to_string()));
    }

    // Header problems surface before a version exists.
    let reader = ReferenceReader::open(&args.file)?;

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let opened: InitResponse = client
        .import(&ImportAction::Init {
            dataset_code: &args.dataset,
            version_tag: &args.tag,
            source_note: args.note.as_deref(),
            file_names: vec![file_name],
        })
        .await?;

    tracing::info!(version_id = %opened.version_id, rows = total, "Import version opened");

    match upload(client, &opened, reader, &args, total, &checksum).await {
        Ok(finalized) => {
            println!(
                "{} {} {} ({} rows, sha256 {})",
                "Activated".green().bold(),
                args.dataset,
                args.tag.cyan(),
                finalized.row_count,
                &checksum[..12]
            );
            if finalized.demoted > 0 {
                println!("  Deprecated {} previous version(s)", finalized.demoted);
            }

            Ok(ImportSummary {
                version_id: finalized.version_id,
                row_count: finalized.row_count,
                checksum,
            })
        },
        Err(e) => {
            let reason = e.to_string();
            tracing::error!(version_id = %opened.version_id, error = %reason, "Import failed, aborting version");

            let aborted: Result<AbortResponse> = client
                .import(&ImportAction::Abort {
                    version_id: opened.version_id,
                    reason: &reason,
                })
                .await;
            if let Err(abort_err) = aborted {
                tracing::warn!(error = %abort_err, "Abort request failed; `reclaim` will clean up");
            }

            Err(CliError::ImportAborted {
                version_id: opened.version_id.to_string(),
                reason,
            })
        },
    }
}

async fn upload(
    client: &ApiClient,
    opened: &InitResponse,
    mut reader: ReferenceReader,
    args: &ImportArgs,
    total: u64,
    checksum: &str,
) -> Result<FinalizeResponse> {
    let progress = create_progress_bar(total, &format!("Importing {} {}", args.dataset, args.tag));
    let mut sent: i64 = 0;
    let mut has_dhi = false;

    while let Some(rows) = reader.next_chunk(args.batch_size)? {
        has_dhi |= rows.iter().any(|r| r.dhi > 0.0);

        let accepted: BatchResponse = client
            .import(&ImportAction::Batch {
                version_id: opened.version_id,
                rows: &rows,
            })
            .await?;

        if accepted.inserted != rows.len() as u64 {
            return Err(CliError::api(format!(
                "server stored {} of {} rows in a batch",
                accepted.inserted,
                rows.len()
            )));
        }

        sent += rows.len() as i64;
        progress.inc(rows.len() as u64);
    }
    progress.finish_and_clear();

    let finalized = client
        .import(&ImportAction::Finalize {
            version_id: opened.version_id,
            dataset_id: opened.dataset_id,
            row_count: sent,
            checksum,
            has_dhi,
        })
        .await?;

    Ok(finalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn reference_file(rows: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "lat,lon,month,ghi,dhi").unwrap();
        for i in 0..rows {
            writeln!(file, "-15.0,-47.0,{},5.5,2.0", i % 12 + 1).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn args(file: &NamedTempFile, batch_size: usize) -> ImportArgs {
        ImportArgs {
            file: file.path().to_path_buf(),
            dataset: "reference".to_string(),
            tag: "2024.1".to_string(),
            note: None,
            batch_size,
            expect_checksum: None,
        }
    }

    async fn mount_init(server: &MockServer, version_id: Uuid) {
        Mock::given(method("POST"))
            .and(path("/api/v1/imports"))
            .and(body_partial_json(json!({"action": "init"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"version_id": version_id, "dataset_id": Uuid::new_v4()})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_import_posts_batches_then_finalizes() {
        let server = MockServer::start().await;
        let version_id = Uuid::new_v4();
        let file = reference_file(12);
        let checksum = compute_file_checksum(file.path()).unwrap();

        mount_init(&server, version_id).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/imports"))
            .and(body_partial_json(json!({"action": "batch"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"inserted": 5})))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/imports"))
            .and(body_partial_json(json!({"action": "batch"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"inserted": 2})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/imports"))
            .and(body_partial_json(json!({
                "action": "finalize",
                "row_count": 12,
                "checksum": checksum,
                "has_dhi": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version_id": version_id, "row_count": 12, "demoted": 1, "cache_purged": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None).unwrap();
        let summary = run(&client, args(&file, 5)).await.unwrap();
        assert_eq!(summary.row_count, 12);
        assert_eq!(summary.version_id, version_id);
        assert_eq!(summary.checksum, checksum);
    }

    #[tokio::test]
    async fn test_failed_batch_aborts_version() {
        let server = MockServer::start().await;
        let version_id = Uuid::new_v4();
        let file = reference_file(3);

        mount_init(&server, version_id).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/imports"))
            .and(body_partial_json(json!({"action": "batch"})))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": "Version is failed, only processing versions accept rows",
                "code": "CONFLICT"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/imports"))
            .and(body_partial_json(json!({"action": "abort", "version_id": version_id})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "deleted_points": 0})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), None).unwrap();
        let err = run(&client, args(&file, 10)).await.unwrap_err();
        assert!(matches!(err, CliError::ImportAborted { ref reason, .. } if reason.contains("CONFLICT")));
    }

    #[tokio::test]
    async fn test_bad_header_never_opens_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "latitude,longitude,month,ghi,dhi\n1,1,1,1,1").unwrap();
        file.flush().unwrap();

        let client = ApiClient::new(server.uri(), None).unwrap();
        let err = run(&client, args(&file, 10)).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidCsv { .. }));
    }

    #[tokio::test]
    async fn test_checksum_guard() {
        let server = MockServer::start().await;
        let file = reference_file(1);
        let mut import = args(&file, 10);
        import.expect_checksum = Some("00".repeat(32));

        let client = ApiClient::new(server.uri(), None).unwrap();
        let err = run(&client, import).await.unwrap_err();
        assert!(matches!(err, CliError::Common(_)));
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let file = reference_file(1);
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let err = run(&client, args(&file, 0)).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
