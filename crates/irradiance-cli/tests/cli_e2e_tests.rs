//! End-to-end tests for the `irradiance` binary
//!
//! The binary runs against a mock server; these tests cover argument
//! handling, output and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn irradiance(server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("irradiance").unwrap();
    cmd.env_remove("IRRADIANCE_SERVER_URL")
        .env_remove("IRRADIANCE_USER")
        .env("LOG_LEVEL", "error")
        .env("NO_COLOR", "1")
        .arg("--server-url")
        .arg(server.uri())
        .arg("--user")
        .arg("ops");
    cmd
}

#[tokio::test]
async fn test_resolve_prints_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/irradiance/resolve"))
        .and(header("x-user-id", "ops"))
        .and(body_partial_json(json!({"lat": -15.05, "lon": -47.02})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "source": "tier3",
            "cache_hit": false,
            "annual_average": 5.25,
            "distance_km": 5.96
        })))
        .mount(&server)
        .await;

    irradiance(&server)
        .args(["resolve", "-15.05", "-47.02"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""source": "tier3""#))
        .stdout(predicate::str::contains("5.96"));
}

#[tokio::test]
async fn test_resolve_single_tier_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/irradiance/tier1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "tier1 out_of_coverage: coordinate outside tier1 bounding box",
            "code": "OUT_OF_COVERAGE"
        })))
        .mount(&server)
        .await;

    irradiance(&server)
        .args(["resolve", "10", "10", "--tier", "tier1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("OUT_OF_COVERAGE"));
}

#[tokio::test]
async fn test_import_reports_activation() {
    let server = MockServer::start().await;
    let version_id = "0b0c6d51-8a60-4f0d-9d2c-7fd0e7d3c001";

    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .and(body_partial_json(json!({"action": "init", "dataset_code": "reference", "version_tag": "2024.1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version_id": version_id,
            "dataset_id": "7f1c1d7e-4c57-4a40-9d1b-0f3c1f4f8a10"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .and(body_partial_json(json!({"action": "batch"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"inserted": 12})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .and(body_partial_json(json!({"action": "finalize", "row_count": 12})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version_id": version_id,
            "row_count": 12,
            "demoted": 0,
            "cache_purged": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("grid.csv");
    let mut body = String::from("lat,lon,month,ghi,dhi\n");
    for month in 1..=12 {
        body.push_str(&format!("-15.0,-47.0,{month},5.5,2.0\n"));
    }
    fs::write(&csv, body).unwrap();

    irradiance(&server)
        .arg("import")
        .arg(&csv)
        .args(["--dataset", "reference", "--tag", "2024.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activated"))
        .stdout(predicate::str::contains("12 rows"));
}

#[tokio::test]
async fn test_import_missing_file() {
    let server = MockServer::start().await;

    irradiance(&server)
        .args(["import", "/no/such/grid.csv", "--dataset", "reference", "--tag", "v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[tokio::test]
async fn test_datasets_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{
                "id": "7f1c1d7e-4c57-4a40-9d1b-0f3c1f4f8a10",
                "code": "reference",
                "label": "Reference grid",
                "version_count": 3,
                "active_version": {
                    "id": "0b0c6d51-8a60-4f0d-9d2c-7fd0e7d3c001",
                    "version_tag": "2024.1",
                    "row_count": 1200
                }
            }]
        })))
        .mount(&server)
        .await;

    irradiance(&server)
        .arg("datasets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Code"))
        .stdout(predicate::str::contains("reference"))
        .stdout(predicate::str::contains("2024.1"));
}

#[tokio::test]
async fn test_reclaim_and_delete_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .and(body_partial_json(json!({"action": "reclaim"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"reclaimed_versions": 1, "deleted_points": 36})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .and(body_partial_json(json!({"action": "delete_version", "version_tag": "v1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .mount(&server)
        .await;

    irradiance(&server)
        .args(["reclaim", "--stale-after-hours", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("36 point row(s)"));

    irradiance(&server)
        .args(["delete-version", "--dataset", "reference", "--tag", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));
}

#[test]
fn test_no_subcommand_exits_with_usage_code() {
    Command::cargo_bin("irradiance")
        .unwrap()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("subcommand is required"));
}
