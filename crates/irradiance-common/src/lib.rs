//! Irradiance Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the irradiance workspace.
//!
//! # Overview
//!
//! This crate provides functionality used by both the server and the operator CLI:
//!
//! - **Geo**: Coordinates, fixed-point cache keys and haversine distance
//! - **Series**: The twelve-month GHI/DHI series and its JSON shape
//! - **Checksums**: Integrity digests for imported reference files
//! - **Logging**: Centralized `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use irradiance_common::{CacheKey, Coordinate, Tier};
//!
//! let coord = Coordinate::new(-15.05, -47.02)?;
//! let key = CacheKey::live(coord, Tier::Tier2);
//! assert_eq!(key.storage_key(), "-150500:-470200:tier2");
//! # Ok::<(), irradiance_common::IrradianceError>(())
//! ```

pub mod checksum;
pub mod error;
pub mod geo;
pub mod logging;
pub mod series;

// Re-export commonly used types
pub use error::{IrradianceError, Result};
pub use geo::{CacheKey, Coordinate};
pub use series::{annual_average, round_to, MonthlySeries, MonthlyValues, Tier};
