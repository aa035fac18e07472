pub mod abort;
pub mod batch;
pub mod create_dataset;
pub mod delete_version;
pub mod finalize;
pub mod init;
pub mod reclaim;

pub use abort::{AbortCommand, AbortError, AbortResponse};
pub use batch::{BatchCommand, BatchError, BatchResponse, BatchRow};
pub use create_dataset::{CreateDatasetCommand, CreateDatasetError, CreateDatasetResponse};
pub use delete_version::{DeleteVersionCommand, DeleteVersionError, DeleteVersionResponse};
pub use finalize::{FinalizeCommand, FinalizeError, FinalizeResponse};
pub use init::{InitCommand, InitError, InitResponse};
pub use reclaim::{ReclaimCommand, ReclaimError, ReclaimResponse};

/// Longest accepted version tag.
pub const MAX_VERSION_TAG_LEN: usize = 64;

/// 1 to 64 characters of `[A-Za-z0-9._-]`.
pub fn is_valid_version_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= MAX_VERSION_TAG_LEN
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
