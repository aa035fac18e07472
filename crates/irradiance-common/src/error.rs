//! Error types shared across the irradiance workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, IrradianceError>;

/// Main error type for shared domain logic
#[derive(Error, Debug)]
pub enum IrradianceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Latitude must be a finite number in [-90, 90], got {0}")]
    InvalidLatitude(f64),

    #[error("Longitude must be a finite number in [-180, 180], got {0}")]
    InvalidLongitude(f64),

    #[error("Month must be in 1..=12, got {0}")]
    InvalidMonth(i64),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
