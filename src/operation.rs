//! Facade over `DbMap` that every query handler goes through. Flattens
//! the page-grouped results `Blob` returns into a single record list and
//! attaches the synthetic `_id` field records never carry on disk.

use std::path::PathBuf;
use std::sync::Arc;

use crate::blob::{BlobMap, PageRecordsMap};
use crate::constants;
use crate::db_map::DbMap;
use crate::disk::model::{Format, PageRecord, Partition};
use crate::error::Result;
use crate::filter::{FilterItem, SearchPartition};
use crate::fs::FileSystem;

pub struct OperationManager {
    db_map: DbMap,
}

impl OperationManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>, data_caching: bool) -> Self {
        Self {
            db_map: DbMap::new(data_location, fs, data_caching),
        }
    }

    pub fn create_db(&self, db: &str) -> Result<()> {
        self.db_map.add(db)?;
        Ok(())
    }

    pub fn delete_db(&self, db: &str) -> Result<()> {
        self.db_map.delete(db)
    }

    pub fn db_exists(&self, db: &str) -> bool {
        self.db_map.get_blob_map(db).is_ok()
    }

    pub fn create_blob(&self, db: &str, blob: &str, format: Format, partition: Option<Partition>) -> Result<()> {
        let blob_map = self.db_map.get_blob_map(db)?;
        blob_map.add(blob, format, partition)?;
        Ok(())
    }

    pub fn delete_blob(&self, db: &str, blob: &str) -> Result<()> {
        let blob_map = self.db_map.get_blob_map(db)?;
        blob_map.delete(blob)
    }

    pub fn blob_exists(&self, db: &str, blob: &str) -> bool {
        match self.db_map.get_blob_map(db) {
            Ok(blob_map) => blob_map.get(blob).is_ok(),
            Err(_) => false,
        }
    }

    fn blob_map(&self, db: &str) -> Result<Arc<BlobMap>> {
        self.db_map.get_blob_map(db)
    }

    pub fn get_record_by_index(&self, db: &str, blob: &str, page_record_id: &str) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = blob_obj.get_by_record_id(page_record_id)?;
        Ok(build_page_records(result))
    }

    pub fn get_records(
        &self,
        db: &str,
        blob: &str,
        search_partition: Option<SearchPartition>,
        filter_items: Vec<FilterItem>,
    ) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = if blob_obj.is_partition() {
            blob_obj.get_by_partition(search_partition.unwrap_or_default(), filter_items)?
        } else {
            blob_obj.get_full_scan(filter_items)?
        };
        Ok(build_page_records(result))
    }

    pub fn add_records(&self, db: &str, blob: &str, records: Vec<PageRecord>) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = if blob_obj.is_partition() {
            blob_obj.add_with_partition(records)?
        } else {
            blob_obj.add(records)?
        };
        Ok(build_page_records(result))
    }

    pub fn update_record_by_index(
        &self,
        db: &str,
        blob: &str,
        page_record_id: &str,
        update_record: PageRecord,
    ) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = blob_obj.update_by_index(page_record_id, update_record)?;
        Ok(build_page_records(result))
    }

    pub fn update_records(
        &self,
        db: &str,
        blob: &str,
        update_record: PageRecord,
        search_partition: Option<SearchPartition>,
        filter_items: Vec<FilterItem>,
    ) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = if blob_obj.is_partition() {
            blob_obj.update_by_partition(update_record, search_partition.unwrap_or_default(), filter_items)?
        } else {
            blob_obj.update(update_record, filter_items)?
        };
        Ok(build_page_records(result))
    }

    pub fn delete_record_by_index(&self, db: &str, blob: &str, page_record_id: &str) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = blob_obj.delete_by_index(page_record_id)?;
        Ok(build_page_records(result))
    }

    pub fn delete_records(
        &self,
        db: &str,
        blob: &str,
        search_partition: Option<SearchPartition>,
        filter_items: Vec<FilterItem>,
    ) -> Result<Vec<PageRecord>> {
        let blob_obj = self.blob_map(db)?.get(blob)?;
        let result = if blob_obj.is_partition() {
            blob_obj.delete_by_partition(search_partition.unwrap_or_default(), filter_items)?
        } else {
            blob_obj.delete(filter_items)?
        };
        Ok(build_page_records(result))
    }
}

/// Flattens a page-grouped result into a flat record list, stamping each
/// record with the `_id` it was stored under.
pub fn build_page_records(result: PageRecordsMap) -> Vec<PageRecord> {
    let mut records = Vec::new();
    for page_records in result.into_values() {
        for (record_id, mut record) in page_records {
            record.insert(constants::ID_KEY.to_string(), serde_json::Value::String(record_id));
            records.push(record);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::model::{FormatItem, KeyType};
    use crate::fs::OsFileSystem;
    use serde_json::json;

    fn new_manager(root: &std::path::Path) -> OperationManager {
        OperationManager::new(root.to_path_buf(), Arc::new(OsFileSystem), true)
    }

    fn simple_format() -> Format {
        let mut format = Format::new();
        format.insert("name".to_string(), FormatItem { key_type: KeyType::String });
        format
    }

    #[test]
    fn create_db_then_blob_then_add_records_attaches_ids() {
        let dir = tempfile::tempdir().unwrap();
        let operation = new_manager(dir.path());
        operation.create_db("shop").unwrap();
        operation.create_blob("shop", "customers", simple_format(), None).unwrap();

        let mut record = PageRecord::new();
        record.insert("name".to_string(), json!("Ada"));
        let inserted = operation.add_records("shop", "customers", vec![record]).unwrap();

        assert_eq!(inserted.len(), 1);
        let id = inserted[0][constants::ID_KEY].as_str().unwrap();
        assert!(!id.is_empty());

        let fetched = operation.get_record_by_index("shop", "customers", id).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0]["name"], json!("Ada"));
    }

    #[test]
    fn db_exists_reflects_creation() {
        let dir = tempfile::tempdir().unwrap();
        let operation = new_manager(dir.path());
        assert!(!operation.db_exists("shop"));
        operation.create_db("shop").unwrap();
        assert!(operation.db_exists("shop"));
    }
}
