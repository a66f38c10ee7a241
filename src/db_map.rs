//! Top-level registry of databases: validates new database names, and
//! lazily builds a `BlobMap` the first time a database is touched.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::blob::BlobMap;
use crate::disk::DbManager;
use crate::error::{DbError, Result};
use crate::format::DbFormatter;
use crate::fs::FileSystem;

pub struct DbMap {
    inner: Mutex<HashMap<String, Arc<BlobMap>>>,
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
    data_caching: bool,
    db_manager: DbManager,
}

impl DbMap {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>, data_caching: bool) -> Self {
        let db_manager = DbManager::new(data_location.clone(), fs.clone());
        Self {
            inner: Mutex::new(HashMap::new()),
            data_location,
            fs,
            data_caching,
            db_manager,
        }
    }

    pub fn add(&self, db: &str) -> Result<Arc<BlobMap>> {
        let mut inner = self.inner.lock();
        DbFormatter { name: db }.has_db_name_convention()?;
        if self.db_manager.exists(db) {
            return Err(DbError::Exists(format!("db {db} already exists")));
        }
        self.db_manager.create(db)?;
        let blob_map = Arc::new(BlobMap::new(db, self.data_location.clone(), self.fs.clone(), self.data_caching));
        inner.insert(db.to_string(), blob_map.clone());
        Ok(blob_map)
    }

    pub fn delete(&self, db: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        self.db_manager.delete(db)?;
        inner.remove(db);
        Ok(())
    }

    pub fn get_blob_map(&self, db: &str) -> Result<Arc<BlobMap>> {
        let mut inner = self.inner.lock();
        if let Some(blob_map) = inner.get(db) {
            return Ok(blob_map.clone());
        }
        if !self.db_manager.exists(db) {
            return Err(DbError::NotFound(format!("db {db} does not exist")));
        }
        let blob_map = Arc::new(BlobMap::new(db, self.data_location.clone(), self.fs.clone(), self.data_caching));
        inner.insert(db.to_string(), blob_map.clone());
        Ok(blob_map)
    }

    pub fn remove(&self, db: &str) {
        self.inner.lock().remove(db);
    }

    pub fn list(&self) -> Result<Vec<String>> {
        self.db_manager.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;

    fn new_db_map(root: &std::path::Path) -> DbMap {
        DbMap::new(root.to_path_buf(), Arc::new(OsFileSystem), true)
    }

    #[test]
    fn add_rejects_duplicate_db_name() {
        let dir = tempfile::tempdir().unwrap();
        let db_map = new_db_map(dir.path());
        db_map.add("shop").unwrap();
        let err = db_map.add("shop").unwrap_err();
        assert!(matches!(err, DbError::Exists(_)));
    }

    #[test]
    fn get_blob_map_errors_for_unknown_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_map = new_db_map(dir.path());
        assert!(db_map.get_blob_map("shop").is_err());
    }
}
