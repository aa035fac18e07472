//! `irradiance resolve` command implementation

use crate::api::ApiClient;
use crate::error::Result;
use irradiance_common::Tier;
use uuid::Uuid;

/// Look up a coordinate and print the server's JSON answer
pub async fn run(
    client: &ApiClient,
    lat: f64,
    lon: f64,
    tier: Option<Tier>,
    dataset: Option<&str>,
    version_id: Option<Uuid>,
) -> Result<()> {
    let resolution = client.resolve(lat, lon, tier, dataset, version_id).await?;

    tracing::debug!(
        source = %resolution["source"],
        cache_hit = %resolution["cache_hit"],
        "Coordinate resolved"
    );

    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}
