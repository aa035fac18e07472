//! Geographic primitives: validated coordinates, fixed-point cache keys,
//! bounding boxes and great-circle distance.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IrradianceError, Result};
use crate::series::Tier;

/// Mean Earth radius (IUGG) used for every distance reported by the service.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Number of decimal places kept in cache keys (~11 m at the equator).
pub const CACHE_KEY_DECIMALS: u32 = 4;

const CACHE_KEY_SCALE: i64 = 10_000;

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(IrradianceError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(IrradianceError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Fixed-point `(lat, lon)` pair at [`CACHE_KEY_DECIMALS`] places.
    pub fn rounded(&self) -> (i32, i32) {
        (round_e4(self.lat), round_e4(self.lon))
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Truncate a finite decimal-degree value to 4 places as a scaled integer.
///
/// Digits are taken from the shortest decimal representation of the float
/// and cut toward zero, so every value sharing its first four decimals maps
/// to the same key regardless of how `value * 1e4` lands in binary.
pub fn round_e4(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }

    let negative = value < 0.0;
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let whole: i64 = int_part.parse().unwrap_or(0);

    let mut frac = [0i64; CACHE_KEY_DECIMALS as usize];
    for (slot, byte) in frac.iter_mut().zip(frac_part.bytes()) {
        *slot = i64::from(byte.saturating_sub(b'0'));
    }

    let mut scaled = whole * CACHE_KEY_SCALE + frac[0] * 1000 + frac[1] * 100 + frac[2] * 10 + frac[3];
    if negative {
        scaled = -scaled;
    }

    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Haversine distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Deterministic cache key for one resolution method at one rounded point.
///
/// Live tiers are keyed by `(lat, lon, method)`; the local grid tier is also
/// keyed by the dataset version that produced the series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub lat_e4: i32,
    pub lon_e4: i32,
    pub method: Tier,
    pub version_id: Option<Uuid>,
}

impl CacheKey {
    /// Key for a live tier (no version context).
    pub fn live(coord: Coordinate, method: Tier) -> Self {
        let (lat_e4, lon_e4) = coord.rounded();
        Self {
            lat_e4,
            lon_e4,
            method,
            version_id: None,
        }
    }

    /// Key for a local-grid result bound to one dataset version.
    pub fn versioned(coord: Coordinate, version_id: Uuid) -> Self {
        let (lat_e4, lon_e4) = coord.rounded();
        Self {
            lat_e4,
            lon_e4,
            method: Tier::Tier3,
            version_id: Some(version_id),
        }
    }

    /// Primary-key string stored in the cache table.
    pub fn storage_key(&self) -> String {
        match self.version_id {
            Some(version_id) => format!(
                "{}:{}:{}:{}",
                self.lat_e4,
                self.lon_e4,
                self.method.as_str(),
                version_id
            ),
            None => format!("{}:{}:{}", self.lat_e4, self.lon_e4, self.method.as_str()),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Axis-aligned lat/lon rectangle, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Result<Self> {
        Coordinate::new(min_lat, min_lon)?;
        Coordinate::new(max_lat, max_lon)?;
        if min_lat > max_lat || min_lon > max_lon {
            return Err(IrradianceError::Parse(format!(
                "bounding box minimum ({min_lat}, {min_lon}) exceeds maximum ({max_lat}, {max_lon})"
            )));
        }
        Ok(Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        })
    }

    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.lat)
            && (self.min_lon..=self.max_lon).contains(&coord.lon)
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = IrradianceError;

    /// Parses `min_lat,min_lon,max_lat,max_lon`.
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .map_err(|_| IrradianceError::Parse(format!("invalid bounding box value '{p}'")))
            })
            .collect::<Result<Vec<f64>>>()?;

        match parts.as_slice() {
            [min_lat, min_lon, max_lat, max_lon] => {
                Self::new(*min_lat, *min_lon, *max_lat, *max_lon)
            },
            _ => Err(IrradianceError::Parse(format!(
                "bounding box needs 4 comma-separated values, got {}",
                parts.len()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(-15.05, -47.02).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(matches!(
            Coordinate::new(90.1, 0.0),
            Err(IrradianceError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.5),
            Err(IrradianceError::InvalidLongitude(_))
        ));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_round_e4() {
        assert_eq!(round_e4(-15.05), -150_500);
        assert_eq!(round_e4(-47.02), -470_200);
        assert_eq!(round_e4(1.00005), 10_000);
        assert_eq!(round_e4(1.000099), 10_000);
        assert_eq!(round_e4(-1.00005), -10_000);
        assert_eq!(round_e4(-1.00019), -10_001);
        assert_eq!(round_e4(0.0), 0);
        assert_eq!(round_e4(180.0), 1_800_000);
        assert_eq!(round_e4(0.00001), 0);
    }

    #[test]
    fn test_nearby_coordinates_share_key() {
        let a = Coordinate::new(-23.550_51, -46.633_31).unwrap();
        let b = Coordinate::new(-23.550_59, -46.633_38).unwrap();
        assert_eq!(
            CacheKey::live(a, Tier::Tier1).storage_key(),
            CacheKey::live(b, Tier::Tier1).storage_key()
        );
    }

    #[test]
    fn test_fifth_decimal_does_not_split_key() {
        let low = Coordinate::new(10.12344, 20.0).unwrap();
        let high = Coordinate::new(10.12346, 20.0).unwrap();
        assert_eq!(
            CacheKey::live(low, Tier::Tier2).storage_key(),
            CacheKey::live(high, Tier::Tier2).storage_key()
        );
        assert_eq!(CacheKey::live(high, Tier::Tier2).storage_key(), "101234:200000:tier2");
    }

    #[test]
    fn test_storage_key_format() {
        let coord = Coordinate::new(-15.05, -47.02).unwrap();
        assert_eq!(CacheKey::live(coord, Tier::Tier2).storage_key(), "-150500:-470200:tier2");

        let version_id = Uuid::nil();
        assert_eq!(
            CacheKey::versioned(coord, version_id).storage_key(),
            format!("-150500:-470200:tier3:{}", version_id)
        );
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude on the mean sphere.
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.195).abs() < 0.01, "got {d}");

        let d = haversine_km(-15.05, -47.02, -15.0, -47.0);
        assert!((d - 5.960).abs() < 0.01, "got {d}");

        assert_eq!(haversine_km(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_bounding_box_parse_and_contains() {
        let bbox: BoundingBox = "-60,-180,61,-20".parse().unwrap();
        assert!(bbox.contains(&Coordinate::new(-15.0, -47.0).unwrap()));
        assert!(!bbox.contains(&Coordinate::new(48.8, 2.35).unwrap()));
        assert!(bbox.contains(&Coordinate::new(61.0, -20.0).unwrap()));

        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("10,0,5,1".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    proptest! {
        #[test]
        fn prop_round_e4_within_one_unit_toward_zero(value in -180.0f64..180.0) {
            let scaled = f64::from(round_e4(value)) / 10_000.0;
            prop_assert!(scaled.abs() <= value.abs() + 1e-9);
            prop_assert!((value - scaled).abs() < 0.000_100_001);
        }

        #[test]
        fn prop_beyond_fourth_decimal_shares_key(
            negative in any::<bool>(),
            whole in 0u32..180,
            fourth in 0u32..10_000,
            tail_a in 0u32..10_000,
            tail_b in 0u32..10_000,
        ) {
            let sign = if negative { "-" } else { "" };
            let a: f64 = format!("{sign}{whole}.{fourth:04}{tail_a:04}").parse().unwrap();
            let b: f64 = format!("{sign}{whole}.{fourth:04}{tail_b:04}").parse().unwrap();

            let expected = i64::from(whole) * 10_000 + i64::from(fourth);
            let expected = if negative { -expected } else { expected };
            prop_assert_eq!(i64::from(round_e4(a)), expected);
            prop_assert_eq!(round_e4(a), round_e4(b));
        }
    }
}
