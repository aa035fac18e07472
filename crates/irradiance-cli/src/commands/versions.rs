//! `irradiance delete-version` and `irradiance reclaim`

use crate::api::{ApiClient, DeleteVersionResponse, ImportAction, ReclaimResponse};
use crate::error::{CliError, Result};
use colored::Colorize;

/// Permanently remove one version and its points
pub async fn delete(client: &ApiClient, dataset: &str, tag: &str) -> Result<()> {
    let response: DeleteVersionResponse = client
        .import(&ImportAction::DeleteVersion {
            dataset_code: dataset,
            version_tag: tag,
        })
        .await?;

    if !response.deleted {
        return Err(CliError::api(format!("server did not delete {dataset} {tag}")));
    }

    println!("{} {} {}", "Deleted".red().bold(), dataset, tag.cyan());
    Ok(())
}

/// Clean up failed and abandoned imports
pub async fn reclaim(
    client: &ApiClient,
    dataset: Option<&str>,
    stale_after_hours: Option<i64>,
) -> Result<ReclaimResponse> {
    if matches!(stale_after_hours, Some(h) if h <= 0) {
        return Err(CliError::invalid_argument("--stale-after-hours must be positive"));
    }

    let response: ReclaimResponse = client
        .import(&ImportAction::Reclaim {
            dataset_code: dataset,
            stale_after_hours,
        })
        .await?;

    if response.reclaimed_versions == 0 {
        println!("Nothing to reclaim.");
    } else {
        println!(
            "{} {} version(s), {} point row(s)",
            "Reclaimed".green().bold(),
            response.reclaimed_versions,
            response.deleted_points
        );
    }

    Ok(response)
}
