//! SHA-256 digests for imported reference files

use crate::error::{IrradianceError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Longest checksum string the version store accepts.
pub const MAX_CHECKSUM_LEN: usize = 128;

/// Compute the hex SHA-256 of a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

/// Compute the hex SHA-256 of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a file against an expected hex digest (case-insensitive)
pub fn verify_file_checksum(path: impl AsRef<Path>, expected: &str) -> Result<()> {
    let actual = compute_file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(IrradianceError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Whether a client-supplied checksum is storable (non-blank, bounded length).
pub fn is_acceptable_checksum(checksum: &str) -> bool {
    let trimmed = checksum.trim();
    !trimmed.is_empty() && trimmed.len() <= MAX_CHECKSUM_LEN
}
