//! Typed, file-backed persistence for databases, blobs, pages, indexes
//! and partitions. Each manager owns one on-disk artifact shape and
//! knows nothing about the in-memory layer above it.

pub mod blob_manager;
pub mod db_manager;
pub mod format_manager;
pub mod index_manager;
pub mod model;
pub mod page_manager;
pub mod partition_manager;
pub mod paths;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DbError, Result};
use crate::fs::FileSystem;

pub fn read_json<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> Result<T> {
    let bytes = fs.read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|source| DbError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_json<T: Serialize>(fs: &dyn FileSystem, path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| DbError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    fs.write_file(path, &bytes)
}

pub use blob_manager::BlobManager;
pub use db_manager::DbManager;
pub use format_manager::FormatManager;
pub use index_manager::IndexManager;
pub use page_manager::PageManager;
pub use partition_manager::PartitionManager;
