//! Tier 1: live high-resolution regional grid service.
//!
//! The provider returns a full year of sub-hourly observations as CSV for the
//! grid cell containing the query point. Monthly values are built here:
//! interval irradiance (W/m², clamped at zero) becomes interval energy, is
//! summed per day, and the daily kWh totals are averaged over the days present
//! in each month. Months without any rows come back as `0.0` and are listed
//! in `missing_months`.

use async_trait::async_trait;
use irradiance_common::{round_to, Coordinate, MonthlySeries, Tier};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::tier::{FailureKind, ResolveRequest, TierResolver, TierSeries};
use crate::config::Tier1Config;

/// Lines of site metadata preceding the column header.
const METADATA_LINES: usize = 2;

pub struct Tier1Client {
    http: reqwest::Client,
    config: Tier1Config,
}

impl Tier1Client {
    pub fn new(http: reqwest::Client, config: Tier1Config) -> Self {
        Self { http, config }
    }

    async fn download(&self, coord: &Coordinate, api_key: &str) -> Result<String, FailureKind> {
        let params: [(&str, String); 8] = [
            ("api_key", api_key.to_string()),
            ("email", self.config.email.clone().unwrap_or_default()),
            ("wkt", format!("POINT({} {})", coord.lon, coord.lat)),
            ("names", self.config.year.to_string()),
            ("interval", self.config.interval_minutes.to_string()),
            ("attributes", "ghi,dhi".to_string()),
            ("utc", "true".to_string()),
            ("leap_day", "false".to_string()),
        ];

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| FailureKind::Upstream(format!("tier1 request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailureKind::Upstream(format!("tier1 HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| FailureKind::Upstream(format!("failed to read tier1 body: {e}")))
    }
}

#[async_trait]
impl TierResolver for Tier1Client {
    fn tier(&self) -> Tier {
        Tier::Tier1
    }

    fn covers(&self, coord: &Coordinate) -> bool {
        self.config.api_key.is_some() && self.config.bbox.contains(coord)
    }

    #[tracing::instrument(skip(self, request), fields(lat = request.coord.lat, lon = request.coord.lon))]
    async fn resolve(&self, request: &ResolveRequest) -> Result<TierSeries, FailureKind> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| FailureKind::OutOfCoverage("tier1 has no API key configured".into()))?;

        if !self.config.bbox.contains(&request.coord) {
            return Err(FailureKind::OutOfCoverage(
                "coordinate outside tier1 bounding box".into(),
            ));
        }

        let body = self.download(&request.coord, api_key).await?;
        let series =
            aggregate_interval_csv(&body, self.config.interval_minutes, self.config.min_rows)?;

        tracing::debug!(missing = ?series.missing_months, "tier1 series aggregated");

        Ok(TierSeries::at_query_point(request.coord, series))
    }
}

fn skip_lines(body: &str, count: usize) -> Option<&str> {
    let mut rest = body;
    for _ in 0..count {
        let newline = rest.find('\n')?;
        rest = &rest[newline + 1..];
    }
    (!rest.trim().is_empty()).then_some(rest)
}

fn cell<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
    row: usize,
) -> Result<T, FailureKind> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse::<T>().map_err(|_| {
        FailureKind::Upstream(format!("row {row}: column '{column}' has non-numeric value '{raw}'"))
    })
}

/// Turn the provider's interval CSV into monthly mean daily totals (kWh/m²/day).
pub fn aggregate_interval_csv(
    body: &str,
    interval_minutes: u32,
    min_rows: usize,
) -> Result<MonthlySeries, FailureKind> {
    let data = skip_lines(body, METADATA_LINES)
        .ok_or_else(|| FailureKind::EmptyResult("tier1 response has no data section".into()))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FailureKind::Upstream(format!("unreadable tier1 header: {e}")))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| FailureKind::Upstream(format!("tier1 response missing column '{name}'")))
    };
    let year_idx = column("Year")?;
    let month_idx = column("Month")?;
    let day_idx = column("Day")?;
    let ghi_idx = column("GHI")?;
    let dhi_idx = column("DHI")?;

    let interval_hours = f64::from(interval_minutes) / 60.0;
    // (year, month, day) -> (ghi Wh/m², dhi Wh/m²)
    let mut daily: BTreeMap<(i32, u8, u8), (f64, f64)> = BTreeMap::new();
    let mut rows = 0usize;

    for (offset, record) in reader.records().enumerate() {
        let row = offset + 1;
        let record =
            record.map_err(|e| FailureKind::Upstream(format!("malformed tier1 row {row}: {e}")))?;

        let year: i32 = cell(&record, year_idx, "Year", row)?;
        let month: u8 = cell(&record, month_idx, "Month", row)?;
        let day: u8 = cell(&record, day_idx, "Day", row)?;
        let ghi: f64 = cell(&record, ghi_idx, "GHI", row)?;
        let dhi: f64 = cell(&record, dhi_idx, "DHI", row)?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(FailureKind::Upstream(format!(
                "row {row}: invalid date {year}-{month}-{day}"
            )));
        }
        if !ghi.is_finite() || !dhi.is_finite() {
            return Err(FailureKind::Upstream(format!("row {row}: non-finite irradiance")));
        }

        let totals = daily.entry((year, month, day)).or_default();
        totals.0 += ghi.max(0.0) * interval_hours;
        totals.1 += dhi.max(0.0) * interval_hours;
        rows += 1;
    }

    if rows < min_rows {
        return Err(FailureKind::EmptyResult(format!(
            "tier1 returned {rows} data rows, expected at least {min_rows}"
        )));
    }

    // month index -> (sum of daily ghi kWh, sum of daily dhi kWh, days)
    let mut monthly = [(0.0f64, 0.0f64, 0u32); 12];
    for ((_, month, _), (ghi_wh, dhi_wh)) in daily {
        let slot = &mut monthly[usize::from(month - 1)];
        slot.0 += ghi_wh / 1000.0;
        slot.1 += dhi_wh / 1000.0;
        slot.2 += 1;
    }

    let present = monthly
        .iter()
        .zip(1u8..=12)
        .filter(|((_, _, days), _)| *days > 0)
        .map(|((ghi, dhi, days), month)| {
            let days = f64::from(*days);
            (month, round_to(ghi / days, 4), round_to(dhi / days, 4))
        });

    MonthlySeries::from_months(present).map_err(|e| FailureKind::Internal(e.to_string()))
}
