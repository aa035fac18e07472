//! `irradiance datasets` command implementation

use crate::api::{ApiClient, DatasetSummary};
use crate::error::Result;
use colored::Colorize;

/// List datasets with the version currently serving lookups
pub async fn run(client: &ApiClient) -> Result<()> {
    let datasets = client.list_datasets().await?;

    if datasets.is_empty() {
        println!("No datasets found.");
        return Ok(());
    }

    println!("{}", "Datasets:".cyan().bold());
    print!("{}", format_table(&datasets));
    Ok(())
}

fn format_table(datasets: &[DatasetSummary]) -> String {
    use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Code", "Label", "Versions", "Active", "Rows", "Activated"]);

    for dataset in datasets {
        let (tag, rows, activated) = match dataset.active_version {
            Some(ref active) => (
                active.version_tag.clone(),
                active.row_count.map(|r| r.to_string()).unwrap_or_default(),
                active
                    .activated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            ),
            None => ("-".to_string(), String::new(), String::new()),
        };

        table.add_row(vec![
            dataset.code.clone(),
            dataset.label.clone(),
            dataset.version_count.to_string(),
            tag,
            rows,
            activated,
        ]);
    }

    format!("{}\n", table)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_shows_active_version() {
        let datasets: Vec<DatasetSummary> = serde_json::from_value(json!([
            {
                "id": "7f1c1d7e-4c57-4a40-9d1b-0f3c1f4f8a10",
                "code": "reference",
                "label": "Reference grid",
                "version_count": 2,
                "active_version": {
                    "id": "0b0c6d51-8a60-4f0d-9d2c-7fd0e7d3c001",
                    "version_tag": "2024.1",
                    "row_count": 1200,
                    "activated_at": "2026-03-01T12:30:00Z"
                }
            },
            {
                "id": "5a2b9d40-3f0e-4a36-8b0e-1c9f7a9e2b22",
                "code": "brazil",
                "label": "Brazil",
                "version_count": 0
            }
        ]))
        .unwrap();

        let rendered = format_table(&datasets);
        assert!(rendered.contains("2024.1"));
        assert!(rendered.contains("1200"));
        assert!(rendered.contains("2026-03-01 12:30"));
        assert!(rendered.contains("brazil"));
    }
}
