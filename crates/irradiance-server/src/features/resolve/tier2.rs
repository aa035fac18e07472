//! Tier 2: live global climatology service.
//!
//! Monthly means come pre-aggregated in kWh/m²/day, so this tier only
//! validates the payload. Fill values mark the answer as malformed.

use async_trait::async_trait;
use irradiance_common::{round_to, MonthlySeries, Tier};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use super::tier::{FailureKind, ResolveRequest, TierResolver, TierSeries};
use crate::config::Tier2Config;

pub const GHI_PARAMETER: &str = "ALLSKY_SFC_SW_DWN";
pub const DHI_PARAMETER: &str = "ALLSKY_SFC_SW_DIFF";

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Relative gap between `ANN` and the monthly mean that earns a warning.
const ANNUAL_DEVIATION_WARN: f64 = 0.10;

#[derive(Debug, Deserialize)]
struct ClimatologyResponse {
    properties: ClimatologyProperties,
}

#[derive(Debug, Deserialize)]
struct ClimatologyProperties {
    parameter: HashMap<String, BTreeMap<String, f64>>,
}

pub struct Tier2Client {
    http: reqwest::Client,
    config: Tier2Config,
}

impl Tier2Client {
    pub fn new(http: reqwest::Client, config: Tier2Config) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl TierResolver for Tier2Client {
    fn tier(&self) -> Tier {
        Tier::Tier2
    }

    #[tracing::instrument(skip(self, request), fields(lat = request.coord.lat, lon = request.coord.lon))]
    async fn resolve(&self, request: &ResolveRequest) -> Result<TierSeries, FailureKind> {
        let parameters = format!("{GHI_PARAMETER},{DHI_PARAMETER}");
        let latitude = request.coord.lat.to_string();
        let longitude = request.coord.lon.to_string();

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("parameters", parameters.as_str()),
                ("community", "RE"),
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("format", "JSON"),
            ])
            .send()
            .await
            .map_err(|e| FailureKind::Upstream(format!("tier2 request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailureKind::Upstream(format!("tier2 HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FailureKind::Upstream(format!("failed to read tier2 body: {e}")))?;

        let series = parse_climatology(&body)?;
        Ok(TierSeries::at_query_point(request.coord, series))
    }
}

fn monthly_values(
    parameters: &HashMap<String, BTreeMap<String, f64>>,
    name: &str,
) -> Result<([f64; 12], Option<f64>), FailureKind> {
    let table = parameters
        .get(name)
        .ok_or_else(|| FailureKind::Upstream(format!("tier2 response missing parameter {name}")))?;

    let mut values = [0.0; 12];
    for (slot, month) in values.iter_mut().zip(MONTH_NAMES) {
        let value = *table.get(month).ok_or_else(|| {
            FailureKind::Upstream(format!("tier2 parameter {name} missing month {month}"))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(FailureKind::Upstream(format!(
                "tier2 parameter {name} has fill value {value} for {month}"
            )));
        }
        *slot = value;
    }

    Ok((values, table.get("ANN").copied()))
}

/// Validate a climatology payload and turn it into a complete monthly series.
pub fn parse_climatology(body: &str) -> Result<MonthlySeries, FailureKind> {
    let payload: ClimatologyResponse = serde_json::from_str(body)
        .map_err(|e| FailureKind::Upstream(format!("malformed tier2 payload: {e}")))?;
    let parameters = &payload.properties.parameter;

    let (ghi, annual) = monthly_values(parameters, GHI_PARAMETER)?;
    let (dhi, _) = monthly_values(parameters, DHI_PARAMETER)?;

    let annual = annual
        .ok_or_else(|| FailureKind::Upstream(format!("tier2 parameter {GHI_PARAMETER} missing ANN")))?;

    let monthly_mean = ghi.iter().sum::<f64>() / 12.0;
    if monthly_mean > 0.0 && ((annual - monthly_mean) / monthly_mean).abs() > ANNUAL_DEVIATION_WARN {
        tracing::warn!(
            annual,
            monthly_mean = round_to(monthly_mean, 4),
            "tier2 annual value disagrees with monthly mean"
        );
    }

    MonthlySeries::from_months(
        (1u8..=12)
            .zip(ghi.into_iter().zip(dhi))
            .map(|(month, (g, d))| (month, g, d)),
    )
    .map_err(|e| FailureKind::Internal(e.to_string()))
}
