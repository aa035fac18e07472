//! API endpoint URL builders

use irradiance_common::Tier;

/// Orchestrated lookup, or a single tier when `tier` is set
pub fn resolve_url(base_url: &str, tier: Option<Tier>) -> String {
    match tier {
        Some(tier) => format!("{}/api/v1/irradiance/{}", base_url, tier.as_str()),
        None => format!("{}/api/v1/irradiance/resolve", base_url),
    }
}

pub fn imports_url(base_url: &str) -> String {
    format!("{}/api/v1/imports", base_url)
}

pub fn datasets_url(base_url: &str) -> String {
    format!("{}/api/v1/datasets", base_url)
}

pub fn dataset_versions_url(base_url: &str, code: &str) -> String {
    format!("{}/api/v1/datasets/{}/versions", base_url, code)
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url)
}
