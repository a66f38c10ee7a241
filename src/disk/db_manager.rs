use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;

use super::paths;

/// Typed persistence for the top-level `<root>/<db>/` directories.
pub struct DbManager {
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl DbManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { data_location, fs }
    }

    pub fn create(&self, db: &str) -> Result<()> {
        self.fs.create_dir(&paths::db_dir(&self.data_location, db))
    }

    pub fn delete(&self, db: &str) -> Result<()> {
        self.fs
            .delete_dir_recursive(&paths::db_dir(&self.data_location, db))
    }

    pub fn list(&self) -> Result<Vec<String>> {
        self.fs.list_dir(&self.data_location)
    }

    pub fn exists(&self, db: &str) -> bool {
        self.fs.exists(&paths::db_dir(&self.data_location, db))
    }
}
