//! In-memory view over a blob's pages: an optional per-page record cache,
//! plus a registry that mirrors `pages.json` and tracks which page new
//! records land in.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disk::model::PageRecords;
use crate::disk::PageManager;
use crate::error::{DbError, Result};

pub struct Page {
    file_name: String,
    db: String,
    blob: String,
    page_manager: Arc<PageManager>,
    data_caching: bool,
    cache: Mutex<Option<PageRecords>>,
}

impl Page {
    pub fn new(db: &str, blob: &str, file_name: &str, page_manager: Arc<PageManager>, data_caching: bool) -> Self {
        Self {
            file_name: file_name.to_string(),
            db: db.to_string(),
            blob: blob.to_string(),
            page_manager,
            data_caching,
            cache: Mutex::new(None),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn read(&self) -> Result<PageRecords> {
        if !self.data_caching {
            return self.page_manager.get_data(&self.db, &self.blob, &self.file_name);
        }
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(self.page_manager.get_data(&self.db, &self.blob, &self.file_name)?);
        }
        Ok(cache.as_ref().expect("populated above").clone())
    }

    pub fn write(&self, data: PageRecords) -> Result<()> {
        self.page_manager.write_data(&self.db, &self.blob, &self.file_name, &data)?;
        if self.data_caching {
            *self.cache.lock() = Some(data);
        }
        Ok(())
    }
}

pub struct PageMap {
    inner: Mutex<Inner>,
    db: String,
    blob: String,
    page_manager: Arc<PageManager>,
    data_caching: bool,
}

struct Inner {
    items: HashMap<String, Arc<Page>>,
    current: Option<Arc<Page>>,
}

impl PageMap {
    pub fn new(db: &str, blob: &str, page_manager: Arc<PageManager>, data_caching: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: HashMap::new(),
                current: None,
            }),
            db: db.to_string(),
            blob: blob.to_string(),
            page_manager,
            data_caching,
        }
    }

    pub fn initialize(&self) -> Result<()> {
        let pages = self.page_manager.get_all(&self.db, &self.blob)?;
        let mut inner = self.inner.lock();
        for page_item in pages {
            let page = Arc::new(Page::new(
                &self.db,
                &self.blob,
                &page_item.file_name,
                self.page_manager.clone(),
                self.data_caching,
            ));
            inner.items.insert(page_item.file_name, page.clone());
            inner.current = Some(page);
        }
        Ok(())
    }

    pub fn get(&self, file_name: &str) -> Result<Arc<Page>> {
        self.inner
            .lock()
            .items
            .get(file_name)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("{file_name} not found in page map")))
    }

    pub fn get_all(&self) -> Vec<Arc<Page>> {
        self.inner.lock().items.values().cloned().collect()
    }

    pub fn add(&self) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock();
        let file_name = match self.page_manager.create(&self.db, &self.blob) {
            Ok(name) => name,
            Err(e) => return Err(e),
        };
        let page = Arc::new(Page::new(
            &self.db,
            &self.blob,
            &file_name,
            self.page_manager.clone(),
            self.data_caching,
        ));
        inner.items.insert(file_name, page.clone());
        inner.current = Some(page.clone());
        Ok(page)
    }

    /// Returns `true` ("phantom") if the page file was already absent on disk.
    pub fn delete(&self, file_name: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        let is_phantom = self.page_manager.delete(&self.db, &self.blob, file_name)?;
        inner.items.remove(file_name);
        if inner.current.as_ref().is_some_and(|p| p.file_name == file_name) {
            inner.current = None;
        }
        Ok(is_phantom)
    }

    pub fn get_current_page(&self) -> Result<Arc<Page>> {
        self.inner
            .lock()
            .current
            .clone()
            .ok_or_else(|| DbError::NotFound("current page not set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use serde_json::json;

    fn new_page_manager(root: &std::path::Path, db: &str, blob: &str) -> Arc<PageManager> {
        std::fs::create_dir_all(root.join(db).join(blob)).unwrap();
        let manager = Arc::new(PageManager::new(root.to_path_buf(), Arc::new(OsFileSystem)));
        manager.initialize(db, blob).unwrap();
        manager
    }

    #[test]
    fn add_then_get_current_page_round_trips_data() {
        let dir = tempfile::tempdir().unwrap();
        let page_manager = new_page_manager(dir.path(), "shop", "customers");
        let page_map = PageMap::new("shop", "customers", page_manager, true);

        let page = page_map.add().unwrap();
        let mut data = PageRecords::new();
        data.insert("id-1".to_string(), serde_json::Map::from_iter([("name".to_string(), json!("Ada"))]));
        page.write(data.clone()).unwrap();

        let current = page_map.get_current_page().unwrap();
        assert_eq!(current.file_name(), page.file_name());
        assert_eq!(current.read().unwrap(), data);
    }

    #[test]
    fn delete_reports_phantom_only_once_page_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let page_manager = new_page_manager(dir.path(), "shop", "customers");
        let page_map = PageMap::new("shop", "customers", page_manager, true);
        let page = page_map.add().unwrap();
        let file_name = page.file_name().to_string();

        assert!(!page_map.delete(&file_name).unwrap());
        assert!(page_map.get(&file_name).is_err());
        assert!(page_map.get_current_page().is_err());
        assert!(page_map.delete(&file_name).unwrap());
    }
}
