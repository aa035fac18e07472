//! Monthly irradiance series and the tier identifiers that produce them.

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{IrradianceError, Result};

/// Month labels used as JSON keys, January first.
const MONTH_KEYS: [&str; 12] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];

/// Ranked resolution tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Live high-resolution regional grid service
    Tier1,
    /// Live global climatology service
    Tier2,
    /// Local versioned reference grid
    Tier3,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Tier1, Tier::Tier2, Tier::Tier3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier1",
            Tier::Tier2 => "tier2",
            Tier::Tier3 => "tier3",
        }
    }

    /// Whether the tier calls an external provider.
    pub fn is_live(&self) -> bool {
        !matches!(self, Tier::Tier3)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = IrradianceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tier1" | "1" => Ok(Tier::Tier1),
            "tier2" | "2" => Ok(Tier::Tier2),
            "tier3" | "3" => Ok(Tier::Tier3),
            _ => Err(IrradianceError::UnknownTier(s.to_string())),
        }
    }
}

/// Twelve monthly values in kWh/m²/day, January at index 0.
///
/// Serializes as a JSON object keyed `"1"`..`"12"` with every key present.
/// Deserializes from that object or from a plain 12-element array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "MonthlyRepr")]
pub struct MonthlyValues(pub [f64; 12]);

#[derive(Deserialize)]
#[serde(untagged)]
enum MonthlyRepr {
    Keyed(BTreeMap<String, f64>),
    Ordered(Vec<f64>),
}

impl TryFrom<MonthlyRepr> for MonthlyValues {
    type Error = IrradianceError;

    fn try_from(repr: MonthlyRepr) -> Result<Self> {
        match repr {
            MonthlyRepr::Ordered(values) => Self::from_slice(&values),
            MonthlyRepr::Keyed(map) => {
                let mut values = [0.0; 12];
                for (idx, key) in MONTH_KEYS.iter().enumerate() {
                    values[idx] = *map.get(*key).ok_or_else(|| {
                        IrradianceError::InvalidSeries(format!("missing month key '{key}'"))
                    })?;
                }
                if map.len() != 12 {
                    return Err(IrradianceError::InvalidSeries(format!(
                        "expected 12 month keys, got {}",
                        map.len()
                    )));
                }
                Ok(Self(values))
            },
        }
    }
}

impl Serialize for MonthlyValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12))?;
        for (key, value) in MONTH_KEYS.iter().zip(self.0.iter()) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl MonthlyValues {
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; 12] = values.try_into().map_err(|_| {
            IrradianceError::InvalidSeries(format!("expected 12 values, got {}", values.len()))
        })?;
        Ok(Self(array))
    }

    /// Value for a 1-based month.
    pub fn month(&self, month: u8) -> Option<f64> {
        month
            .checked_sub(1)
            .and_then(|idx| self.0.get(usize::from(idx)))
            .copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

/// Paired GHI/DHI monthly series with explicit month coverage.
///
/// Months without source data carry `0.0` and are listed in
/// `missing_months` so a data gap is distinguishable from a dark month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub ghi: MonthlyValues,
    pub dhi: MonthlyValues,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_months: Vec<u8>,
}

impl MonthlySeries {
    /// Build a series from sparse `(month, ghi, dhi)` triples.
    ///
    /// Later duplicates of a month overwrite earlier ones.
    pub fn from_months<I>(months: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, f64, f64)>,
    {
        let mut ghi = [0.0; 12];
        let mut dhi = [0.0; 12];
        let mut seen = [false; 12];

        for (month, g, d) in months {
            if !(1..=12).contains(&month) {
                return Err(IrradianceError::InvalidMonth(i64::from(month)));
            }
            let idx = usize::from(month - 1);
            ghi[idx] = g;
            dhi[idx] = d;
            seen[idx] = true;
        }

        let missing_months = (1u8..=12)
            .zip(seen.iter())
            .filter(|(_, present)| !**present)
            .map(|(month, _)| month)
            .collect();

        Ok(Self {
            ghi: MonthlyValues(ghi),
            dhi: MonthlyValues(dhi),
            missing_months,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.missing_months.is_empty()
    }

    pub fn annual_average(&self) -> f64 {
        annual_average(&self.ghi)
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Arithmetic mean of the twelve values, rounded to 4 decimals.
pub fn annual_average(values: &MonthlyValues) -> f64 {
    round_to(values.0.iter().sum::<f64>() / 12.0, 4)
}
