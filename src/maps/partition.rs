//! Maps partition hash-key buckets to the pages holding their records.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disk::PartitionManager;
use crate::error::Result;

use super::page::{Page, PageMap};

pub struct PartitionMap {
    inner: Mutex<Inner>,
    db: String,
    blob: String,
    partition_manager: Arc<PartitionManager>,
    page_map: Arc<PageMap>,
}

struct Inner {
    items: HashMap<String, Vec<String>>,
    current: HashMap<String, String>,
}

impl PartitionMap {
    pub fn new(db: &str, blob: &str, partition_manager: Arc<PartitionManager>, page_map: Arc<PageMap>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: HashMap::new(),
                current: HashMap::new(),
            }),
            db: db.to_string(),
            blob: blob.to_string(),
            partition_manager,
            page_map,
        }
    }

    pub fn initialize(&self) -> Result<()> {
        let hash_keys = self.partition_manager.get_all(&self.db, &self.blob)?;
        let mut inner = self.inner.lock();
        for hash_key in hash_keys {
            let partition_pages = self.partition_manager.get_by_hash_key(&self.db, &self.blob, &hash_key)?;
            for partition_page in partition_pages {
                if self.page_map.get(&partition_page.file_name).is_err() {
                    continue;
                }
                inner
                    .items
                    .entry(hash_key.clone())
                    .or_default()
                    .push(partition_page.file_name.clone());
                inner.current.insert(hash_key.clone(), partition_page.file_name);
            }
        }
        Ok(())
    }

    pub fn get_by_hash(&self, hash_key_file: &str) -> Vec<Arc<Page>> {
        let inner = self.inner.lock();
        let Some(file_names) = inner.items.get(hash_key_file) else {
            return Vec::new();
        };
        file_names
            .iter()
            .filter_map(|file_name| self.page_map.get(file_name).ok())
            .collect()
    }

    pub fn get_all_hash_keys(&self) -> Vec<String> {
        self.inner.lock().items.keys().cloned().collect()
    }

    pub fn add(&self, hash_key_file: &str, page_file_name: &str) -> Result<()> {
        self.page_map.get(page_file_name)?;
        self.partition_manager
            .add_page(&self.db, &self.blob, hash_key_file, page_file_name)?;
        let mut inner = self.inner.lock();
        inner
            .items
            .entry(hash_key_file.to_string())
            .or_default()
            .push(page_file_name.to_string());
        inner.current.insert(hash_key_file.to_string(), page_file_name.to_string());
        Ok(())
    }

    pub fn delete(&self, hash_key_file: &str, page_file_name: &str) -> Result<()> {
        self.partition_manager
            .remove(&self.db, &self.blob, hash_key_file, page_file_name)?;
        let mut inner = self.inner.lock();
        if let Some(file_names) = inner.items.get_mut(hash_key_file) {
            if let Some(pos) = file_names.iter().position(|f| f == page_file_name) {
                file_names.remove(pos);
                if inner.current.get(hash_key_file).map(String::as_str) == Some(page_file_name) {
                    inner.current.remove(hash_key_file);
                }
                if inner.items.get(hash_key_file).is_some_and(Vec::is_empty) {
                    inner.items.remove(hash_key_file);
                }
            }
        }
        Ok(())
    }

    pub fn get_current_page(&self, hash_key_file: &str) -> Result<Arc<Page>> {
        let file_name = self
            .inner
            .lock()
            .current
            .get(hash_key_file)
            .cloned()
            .ok_or_else(|| crate::error::DbError::NotFound("current partition page not found".to_string()))?;
        self.page_map.get(&file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::model::Partition;
    use crate::disk::PageManager;
    use crate::fs::OsFileSystem;

    fn new_maps(root: &std::path::Path, db: &str, blob: &str) -> (Arc<PageMap>, PartitionMap) {
        std::fs::create_dir_all(root.join(db).join(blob)).unwrap();
        let fs = Arc::new(OsFileSystem);
        let page_manager = Arc::new(PageManager::new(root.to_path_buf(), fs.clone()));
        page_manager.initialize(db, blob).unwrap();
        let partition_manager = Arc::new(PartitionManager::new(root.to_path_buf(), fs));
        partition_manager
            .initialize(db, blob, &Partition { keys: vec!["region".to_string()] })
            .unwrap();

        let page_map = Arc::new(PageMap::new(db, blob, page_manager, true));
        let partition_map = PartitionMap::new(db, blob, partition_manager, page_map.clone());
        (page_map, partition_map)
    }

    #[test]
    fn add_then_get_by_hash_and_current_page_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (page_map, partition_map) = new_maps(dir.path(), "shop", "customers");
        let page = page_map.add().unwrap();

        partition_map.add("east.json", page.file_name()).unwrap();

        let pages = partition_map.get_by_hash("east.json");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].file_name(), page.file_name());
        assert_eq!(partition_map.get_all_hash_keys(), vec!["east.json".to_string()]);
        assert_eq!(partition_map.get_current_page("east.json").unwrap().file_name(), page.file_name());
    }

    #[test]
    fn delete_drops_hash_bucket_once_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (page_map, partition_map) = new_maps(dir.path(), "shop", "customers");
        let page = page_map.add().unwrap();
        partition_map.add("east.json", page.file_name()).unwrap();

        partition_map.delete("east.json", page.file_name()).unwrap();

        assert!(partition_map.get_by_hash("east.json").is_empty());
        assert!(partition_map.get_current_page("east.json").is_err());
        assert!(partition_map.get_all_hash_keys().is_empty());
    }
}
