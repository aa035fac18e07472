pub mod list_datasets;
pub mod list_versions;

pub use list_datasets::{ActiveVersionInfo, DatasetListItem, ListDatasetsError};
pub use list_versions::{ListVersionsError, ListVersionsQuery};
