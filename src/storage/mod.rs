pub mod catalog;
pub mod json_file;
pub mod models;
pub mod profile_store;

use std::path::PathBuf;

pub use catalog::{CatalogKind, CatalogStore};
pub use models::{ChildProfile, ProfileUpdate, UserRecord};
pub use profile_store::ProfileStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid user id '{0}'")]
    InvalidUserId(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}
