//! Error types for the irradiance CLI
//!
//! Messages are user-facing and say what to check next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Server answered with an error body
    #[error("Server rejected the request ({status} {code}): {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    /// Server answered with something that is not an error body
    #[error("Server error: {0}. Ensure the irradiance server is running and accessible.")]
    Api(String),

    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// Reference CSV has a bad header or row
    #[error("Invalid reference file at line {line}: {reason}")]
    InvalidCsv { line: u64, reason: String },

    #[error("Reference file '{0}' holds no data rows")]
    EmptyFile(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Import failed after `init`; the version was aborted
    #[error("Import of version {version_id} aborted: {reason}")]
    ImportAborted { version_id: String, reason: String },

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Network request failed: {0}. Check the server URL.")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] irradiance_common::IrradianceError),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    pub fn invalid_csv(line: u64, reason: impl Into<String>) -> Self {
        Self::InvalidCsv {
            line,
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
