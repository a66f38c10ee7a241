//! In-memory view over a blob's indexes, bucketed by the first character
//! of the record id so lookups only ever scan one bucket's index files.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disk::model::IndexRecords;
use crate::disk::IndexManager;
use crate::error::{DbError, Result};

pub struct Index {
    file_name: String,
    db: String,
    blob: String,
    index_manager: Arc<IndexManager>,
    data_caching: bool,
    cache: Mutex<Option<IndexRecords>>,
}

impl Index {
    pub fn new(db: &str, blob: &str, file_name: &str, index_manager: Arc<IndexManager>, data_caching: bool) -> Self {
        Self {
            file_name: file_name.to_string(),
            db: db.to_string(),
            blob: blob.to_string(),
            index_manager,
            data_caching,
            cache: Mutex::new(None),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn read(&self) -> Result<IndexRecords> {
        if !self.data_caching {
            return self.index_manager.get_data(&self.db, &self.blob, &self.file_name);
        }
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(self.index_manager.get_data(&self.db, &self.blob, &self.file_name)?);
        }
        Ok(cache.as_ref().expect("populated above").clone())
    }

    pub fn write(&self, data: IndexRecords) -> Result<()> {
        self.index_manager.write_data(&self.db, &self.blob, &self.file_name, &data)?;
        if self.data_caching {
            *self.cache.lock() = Some(data);
        }
        Ok(())
    }

    /// Removes `page_record_ids` from the index, returning the number of
    /// entries left behind.
    pub fn delete(&self, page_record_ids: &[String]) -> Result<usize> {
        let mut records = self.read()?;
        for id in page_record_ids {
            records.remove(id);
        }
        let remaining = records.len();
        self.write(records)?;
        Ok(remaining)
    }
}

pub struct IndexMap {
    inner: Mutex<Inner>,
    db: String,
    blob: String,
    index_manager: Arc<IndexManager>,
    data_caching: bool,
}

struct Inner {
    items: HashMap<String, HashMap<String, Arc<Index>>>,
    current: HashMap<String, Arc<Index>>,
}

impl IndexMap {
    pub fn new(db: &str, blob: &str, index_manager: Arc<IndexManager>, data_caching: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: HashMap::new(),
                current: HashMap::new(),
            }),
            db: db.to_string(),
            blob: blob.to_string(),
            index_manager,
            data_caching,
        }
    }

    pub fn initialize(&self) -> Result<()> {
        let indexes = self.index_manager.get_all(&self.db, &self.blob)?;
        let mut inner = self.inner.lock();
        for (prefix, item) in indexes {
            let bucket = inner.items.entry(prefix.clone()).or_default();
            for file_name in item.file_names {
                let index = Arc::new(Index::new(
                    &self.db,
                    &self.blob,
                    &file_name,
                    self.index_manager.clone(),
                    self.data_caching,
                ));
                bucket.insert(file_name, index.clone());
                inner.current.insert(prefix.clone(), index);
            }
        }
        Ok(())
    }

    pub fn get(&self, prefix: &str, file_name: &str) -> Result<Arc<Index>> {
        self.inner
            .lock()
            .items
            .get(prefix)
            .and_then(|bucket| bucket.get(file_name))
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("index file {file_name} not found")))
    }

    pub fn get_by_prefix(&self, prefix: &str) -> Vec<Arc<Index>> {
        self.inner
            .lock()
            .items
            .get(prefix)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn add(&self, page_record_id: &str) -> Result<Arc<Index>> {
        let mut inner = self.inner.lock();
        let file_name = self.index_manager.create(&self.db, &self.blob, page_record_id)?;
        let prefix = self.index_manager.get_page_record_id_prefix(page_record_id);
        let index = Arc::new(Index::new(
            &self.db,
            &self.blob,
            &file_name,
            self.index_manager.clone(),
            self.data_caching,
        ));
        inner.items.entry(prefix.clone()).or_default().insert(file_name, index.clone());
        inner.current.insert(prefix, index.clone());
        Ok(index)
    }

    pub fn delete(&self, prefix: &str, file_name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let is_phantom = self.index_manager.delete(&self.db, &self.blob, file_name)?;
        if let Some(bucket) = inner.items.get_mut(prefix) {
            bucket.remove(file_name);
            if bucket.is_empty() {
                inner.items.remove(prefix);
                if inner.current.get(prefix).is_some_and(|i| i.file_name == file_name) {
                    inner.current.remove(prefix);
                }
            }
        }
        let _ = is_phantom;
        Ok(())
    }

    pub fn get_current_index(&self, prefix: &str) -> Result<Arc<Index>> {
        self.inner
            .lock()
            .current
            .get(prefix)
            .cloned()
            .ok_or_else(|| DbError::NotFound("current index not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;

    fn new_index_manager(root: &std::path::Path, db: &str, blob: &str) -> Arc<IndexManager> {
        std::fs::create_dir_all(root.join(db).join(blob)).unwrap();
        let manager = Arc::new(IndexManager::new(root.to_path_buf(), Arc::new(OsFileSystem)));
        manager.initialize(db, blob).unwrap();
        manager
    }

    #[test]
    fn add_then_get_current_index_round_trips_data() {
        let dir = tempfile::tempdir().unwrap();
        let index_manager = new_index_manager(dir.path(), "shop", "customers");
        let index_map = IndexMap::new("shop", "customers", index_manager, true);

        let index = index_map.add("a-record-id").unwrap();
        let mut records = IndexRecords::new();
        records.insert("a-record-id".to_string(), "page-1.json".to_string());
        index.write(records.clone()).unwrap();

        let current = index_map.get_current_index("a").unwrap();
        assert_eq!(current.file_name(), index.file_name());
        assert_eq!(current.read().unwrap(), records);
        assert_eq!(index_map.get_by_prefix("a").len(), 1);
    }

    #[test]
    fn delete_drops_prefix_bucket_once_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index_manager = new_index_manager(dir.path(), "shop", "customers");
        let index_map = IndexMap::new("shop", "customers", index_manager, true);
        let index = index_map.add("a-record-id").unwrap();

        let remaining = index.delete(&["a-record-id".to_string()]).unwrap();
        assert_eq!(remaining, 0);

        index_map.delete("a", index.file_name()).unwrap();
        assert!(index_map.get_by_prefix("a").is_empty());
        assert!(index_map.get_current_index("a").is_err());
    }
}
