use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;

use super::paths;

/// Typed persistence for a blob's own directory (its sub-artifacts —
/// format/pages/indexes/partitions — are owned by the other managers).
pub struct BlobManager {
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl BlobManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { data_location, fs }
    }

    pub fn create(&self, db: &str, blob: &str) -> Result<()> {
        self.fs
            .create_dir(&paths::blob_dir(&self.data_location, db, blob))
    }

    pub fn delete(&self, db: &str, blob: &str) -> Result<()> {
        self.fs
            .delete_dir_recursive(&paths::blob_dir(&self.data_location, db, blob))
    }

    pub fn list(&self, db: &str) -> Result<Vec<String>> {
        self.fs.list_dir(&paths::db_dir(&self.data_location, db))
    }

    pub fn exists(&self, db: &str, blob: &str) -> bool {
        self.fs.exists(&paths::blob_dir(&self.data_location, db, blob))
    }
}
