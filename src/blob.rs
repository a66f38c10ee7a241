//! The core collection engine: one `Blob` per collection, holding its
//! page/index/partition maps and the format/partition metadata records
//! are validated and coerced against. `BlobMap` is the per-database
//! registry of `Blob`s, built lazily the first time a blob is touched.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use uuid::Uuid;

use crate::constants;
use crate::disk::model::{Format, PageRecord, PageRecords, Partition};
use crate::disk::{BlobManager, FormatManager, IndexManager, PageManager, PartitionManager};
use crate::error::{DbError, Result};
use crate::filter::{Filter, FilterItem, SearchPartition};
use crate::format::BlobFormatter;
use crate::fs::FileSystem;
use crate::maps::{IndexMap, PageMap, PartitionMap};

/// Records grouped by the page file they live in.
pub type PageRecordsMap = HashMap<String, PageRecords>;

pub struct BlobMap {
    inner: Mutex<HashMap<String, Arc<Blob>>>,
    db: String,
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
    data_caching: bool,
}

impl BlobMap {
    pub fn new(db: &str, data_location: PathBuf, fs: Arc<dyn FileSystem>, data_caching: bool) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            db: db.to_string(),
            data_location,
            fs,
            data_caching,
        }
    }

    pub fn add(&self, blob: &str, format: Format, partition: Option<Partition>) -> Result<Arc<Blob>> {
        let mut inner = self.inner.lock();
        let blob_obj = Arc::new(Blob::initialize(
            &self.db,
            blob,
            self.data_location.clone(),
            self.fs.clone(),
            format,
            partition,
            self.data_caching,
        )?);
        inner.insert(blob.to_string(), blob_obj.clone());
        Ok(blob_obj)
    }

    pub fn get(&self, blob: &str) -> Result<Arc<Blob>> {
        let mut inner = self.inner.lock();
        if let Some(blob_obj) = inner.get(blob) {
            return Ok(blob_obj.clone());
        }
        let blob_obj = Arc::new(Blob::load(
            &self.db,
            blob,
            self.data_location.clone(),
            self.fs.clone(),
            self.data_caching,
        )?);
        inner.insert(blob.to_string(), blob_obj.clone());
        Ok(blob_obj)
    }

    pub fn delete(&self, blob: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(blob_obj) = inner.get(blob) {
            blob_obj.delete_blob()?;
            inner.remove(blob);
        }
        Ok(())
    }

    pub fn remove(&self, blob: &str) {
        self.inner.lock().remove(blob);
    }
}

pub struct Blob {
    op_lock: Mutex<()>,
    db: String,
    blob: String,
    page_map: Arc<PageMap>,
    index_map: Arc<IndexMap>,
    partition_map: Arc<PartitionMap>,
    partition: Option<Partition>,
    format: Format,
    index_manager: Arc<IndexManager>,
    partition_manager: Arc<PartitionManager>,
    blob_manager: Arc<BlobManager>,
}

impl Blob {
    /// Loads an existing blob's metadata and rehydrates its maps from disk.
    fn load(db: &str, blob: &str, data_location: PathBuf, fs: Arc<dyn FileSystem>, data_caching: bool) -> Result<Self> {
        let index_manager = Arc::new(IndexManager::new(data_location.clone(), fs.clone()));
        let partition_manager = Arc::new(PartitionManager::new(data_location.clone(), fs.clone()));
        let blob_manager = Arc::new(BlobManager::new(data_location.clone(), fs.clone()));
        let format_manager = FormatManager::new(data_location.clone(), fs.clone());
        let page_manager = Arc::new(PageManager::new(data_location.clone(), fs.clone()));

        let page_map = Arc::new(PageMap::new(db, blob, page_manager, data_caching));
        let index_map = Arc::new(IndexMap::new(db, blob, index_manager.clone(), data_caching));
        let partition_map = Arc::new(PartitionMap::new(
            db,
            blob,
            partition_manager.clone(),
            page_map.clone(),
        ));

        let format = format_manager.get(db, blob)?;
        page_map.initialize()?;
        index_map.initialize()?;

        let partition = match partition_manager.get_partition(db, blob) {
            Ok(partition) => {
                partition_map.initialize()?;
                Some(partition)
            }
            Err(_) => None,
        };

        Ok(Self {
            op_lock: Mutex::new(()),
            db: db.to_string(),
            blob: blob.to_string(),
            page_map,
            index_map,
            partition_map,
            partition,
            format,
            index_manager,
            partition_manager,
            blob_manager,
        })
    }

    /// Validates a new blob's name/format/partition shape and creates its
    /// on-disk structures before building its in-memory maps.
    #[allow(clippy::too_many_arguments)]
    fn initialize(
        db: &str,
        blob: &str,
        data_location: PathBuf,
        fs: Arc<dyn FileSystem>,
        format: Format,
        partition: Option<Partition>,
        data_caching: bool,
    ) -> Result<Self> {
        let formatter = match &partition {
            Some(partition) => {
                let formatter = BlobFormatter::with_partition(blob, &format, partition);
                formatter.has_partition_structure()?;
                formatter
            }
            None => BlobFormatter::new(blob, &format),
        };
        formatter.has_blob_name_convention()?;
        formatter.has_format_structure()?;

        let blob_manager = Arc::new(BlobManager::new(data_location.clone(), fs.clone()));
        let format_manager = FormatManager::new(data_location.clone(), fs.clone());
        let page_manager = Arc::new(PageManager::new(data_location.clone(), fs.clone()));
        let index_manager = Arc::new(IndexManager::new(data_location.clone(), fs.clone()));
        let partition_manager = Arc::new(PartitionManager::new(data_location.clone(), fs.clone()));

        if blob_manager.exists(db, blob) {
            return Err(DbError::Exists(format!("blob {db}.{blob} already exists")));
        }
        blob_manager.create(db, blob)?;
        let rollback = |e: DbError| -> DbError {
            let _ = blob_manager.delete(db, blob);
            e
        };
        format_manager.create(db, blob, &format).map_err(rollback)?;
        page_manager.initialize(db, blob).map_err(rollback)?;
        index_manager.initialize(db, blob).map_err(rollback)?;
        if let Some(partition) = &partition {
            partition_manager
                .initialize(db, blob, partition)
                .map_err(rollback)?;
        }

        let page_map = Arc::new(PageMap::new(db, blob, page_manager, data_caching));
        let index_map = Arc::new(IndexMap::new(db, blob, index_manager.clone(), data_caching));
        let partition_map = Arc::new(PartitionMap::new(
            db,
            blob,
            partition_manager.clone(),
            page_map.clone(),
        ));

        Ok(Self {
            op_lock: Mutex::new(()),
            db: db.to_string(),
            blob: blob.to_string(),
            page_map,
            index_map,
            partition_map,
            partition,
            format,
            index_manager,
            partition_manager,
            blob_manager,
        })
    }

    pub fn is_partition(&self) -> bool {
        self.partition.is_some()
    }

    fn formatter(&self) -> BlobFormatter<'_> {
        match &self.partition {
            Some(partition) => BlobFormatter::with_partition(&self.blob, &self.format, partition),
            None => BlobFormatter::new(&self.blob, &self.format),
        }
    }

    fn delete_blob(&self) -> Result<()> {
        self.blob_manager.delete(&self.db, &self.blob)
    }

    pub fn get_by_record_id(&self, page_record_id: &str) -> Result<PageRecordsMap> {
        let prefix = self.index_manager.get_page_record_id_prefix(page_record_id);
        for index in self.index_map.get_by_prefix(&prefix) {
            let index_records = index.read()?;
            let Some(page_file) = index_records.get(page_record_id) else {
                continue;
            };
            let page = self.page_map.get(page_file)?;
            let data = page.read()?;
            let record = data
                .get(page_record_id)
                .ok_or_else(|| DbError::NotFound(format!("record with id {page_record_id} not found in page {page_file}")))?;
            let formatted = self.formatter().format_record(record)?;
            let mut page_records = PageRecords::new();
            page_records.insert(page_record_id.to_string(), formatted);
            let mut total = PageRecordsMap::new();
            total.insert(page_file.clone(), page_records);
            return Ok(total);
        }
        Ok(PageRecordsMap::new())
    }

    pub fn get_full_scan(&self, filter_items: Vec<FilterItem>) -> Result<PageRecordsMap> {
        let mut filter = Filter::new(filter_items, self.format.clone());
        filter.convert_filter_items()?;
        let pages = self.page_map.get_all();
        Ok(self.search_pages(&pages, |page| self.search_page(page, &filter)))
    }

    pub fn get_by_partition(
        &self,
        search_partition: SearchPartition,
        filter_items: Vec<FilterItem>,
    ) -> Result<PageRecordsMap> {
        let Some(partition) = &self.partition else {
            return Ok(PageRecordsMap::new());
        };
        let mut filter = Filter::new(filter_items, self.format.clone());
        filter.convert_filter_items()?;
        let hash_key_files = self.filter_hash_key_files(partition, &self.partition_map.get_all_hash_keys(), &search_partition)?;

        let mut total = PageRecordsMap::new();
        for hash_key_file in hash_key_files {
            let pages = self.partition_map.get_by_hash(&hash_key_file);
            total.extend(self.search_pages(&pages, |page| self.search_page(page, &filter)));
        }
        Ok(total)
    }

    pub fn add_with_partition(&self, insert_records: Vec<PageRecord>) -> Result<PageRecordsMap> {
        let Some(partition) = self.partition.clone() else {
            return Ok(PageRecordsMap::new());
        };
        let _guard = self.op_lock.lock();
        let formatter = self.formatter();
        let mut by_hash_key: HashMap<String, Vec<PageRecord>> = HashMap::new();
        for record in insert_records {
            let formatted = formatter.format_record(&record)?;
            let hash_key = self.partition_manager.get_hash_key(&partition, &formatted)?;
            by_hash_key.entry(hash_key).or_default().push(formatted);
        }

        let mut total = PageRecordsMap::new();
        for (hash_key, records) in by_hash_key {
            let partition_total = self.add_records_by_partition(&hash_key, records)?;
            for (page_file, data) in partition_total {
                if !data.is_empty() {
                    total.insert(page_file, data);
                }
            }
        }
        Ok(total)
    }

    pub fn add(&self, insert_records: Vec<PageRecord>) -> Result<PageRecordsMap> {
        if self.partition.is_some() {
            return Ok(PageRecordsMap::new());
        }
        let _guard = self.op_lock.lock();
        let mut current_page = match self.page_map.get_current_page() {
            Ok(page) => page,
            Err(_) => self.page_map.add()?,
        };
        let formatter = self.formatter();
        let mut page_records = current_page.read()?;
        let mut total = PageRecordsMap::new();
        total.insert(current_page.file_name().to_string(), PageRecords::new());
        let mut indexes = crate::disk::model::IndexRecords::new();

        for insert_record in insert_records {
            if page_records.len() >= constants::MAX_PAGE_SIZE {
                current_page.write(std::mem::take(&mut page_records))?;
                current_page = self.page_map.add()?;
                total.insert(current_page.file_name().to_string(), PageRecords::new());
            }

            let formatted = formatter.format_record(&insert_record)?;
            let record_id = Uuid::new_v4().to_string();
            page_records.insert(record_id.clone(), formatted.clone());
            total
                .get_mut(current_page.file_name())
                .expect("inserted above")
                .insert(record_id.clone(), formatted);
            indexes.insert(record_id, current_page.file_name().to_string());
        }
        current_page.write(page_records)?;
        self.add_indexes(indexes)?;
        Ok(total)
    }

    pub fn update_by_index(&self, page_record_id: &str, update_record: PageRecord) -> Result<PageRecordsMap> {
        let _guard = self.op_lock.lock();
        let formatter = self.formatter();
        let updated = formatter.format_update_record(&update_record)?;
        let prefix = self.index_manager.get_page_record_id_prefix(page_record_id);
        for index in self.index_map.get_by_prefix(&prefix) {
            let index_records = index.read()?;
            let Some(page_file) = index_records.get(page_record_id) else {
                continue;
            };
            let page = self.page_map.get(page_file)?;
            let mut data = page.read()?;
            if !data.contains_key(page_record_id) {
                return Err(DbError::NotFound(format!(
                    "record with id {page_record_id} not found in page {page_file}"
                )));
            }
            for (key, value) in &updated {
                data.get_mut(page_record_id).expect("checked above").insert(key.clone(), value.clone());
            }
            page.write(data)?;
            let mut page_records = PageRecords::new();
            page_records.insert(page_record_id.to_string(), updated);
            let mut total = PageRecordsMap::new();
            total.insert(page_file.clone(), page_records);
            return Ok(total);
        }
        Ok(PageRecordsMap::new())
    }

    pub fn update_by_partition(
        &self,
        update_record: PageRecord,
        search_partition: SearchPartition,
        filter_items: Vec<FilterItem>,
    ) -> Result<PageRecordsMap> {
        let Some(partition) = self.partition.clone() else {
            return Ok(PageRecordsMap::new());
        };
        let _guard = self.op_lock.lock();
        let formatter = self.formatter();
        let updated = formatter.format_update_record(&update_record)?;
        let mut filter = Filter::new(filter_items, self.format.clone());
        filter.convert_filter_items()?;
        let hash_key_files = self.filter_hash_key_files(&partition, &self.partition_map.get_all_hash_keys(), &search_partition)?;

        let mut total = PageRecordsMap::new();
        for hash_key_file in hash_key_files {
            let pages = self.partition_map.get_by_hash(&hash_key_file);
            total.extend(self.search_pages(&pages, |page| self.search_page_update(page, &filter, &updated)));
        }
        Ok(total)
    }

    pub fn update(&self, update_record: PageRecord, filter_items: Vec<FilterItem>) -> Result<PageRecordsMap> {
        let _guard = self.op_lock.lock();
        let mut filter = Filter::new(filter_items, self.format.clone());
        filter.convert_filter_items()?;
        let updated = self.formatter().format_update_record(&update_record)?;
        let pages = self.page_map.get_all();
        Ok(self.search_pages(&pages, |page| self.search_page_update(page, &filter, &updated)))
    }

    pub fn delete_by_index(&self, page_record_id: &str) -> Result<PageRecordsMap> {
        let _guard = self.op_lock.lock();
        let prefix = self.index_manager.get_page_record_id_prefix(page_record_id);
        for index in self.index_map.get_by_prefix(&prefix) {
            let index_records = index.read()?;
            let Some(page_file) = index_records.get(page_record_id) else {
                continue;
            };
            let page = self.page_map.get(page_file)?;
            let mut data = page.read()?;
            let Some(deleted) = data.remove(page_record_id) else {
                return Err(DbError::NotFound(format!(
                    "record with id {page_record_id} not found in page {page_file}"
                )));
            };
            page.write(data)?;

            let mut index_records = index_records;
            index_records.remove(page_record_id);
            index.write(index_records)?;

            let mut page_records = PageRecords::new();
            page_records.insert(page_record_id.to_string(), deleted);
            let mut total = PageRecordsMap::new();
            total.insert(page_file.clone(), page_records);
            return Ok(total);
        }
        Ok(PageRecordsMap::new())
    }

    pub fn delete_by_partition(
        &self,
        search_partition: SearchPartition,
        filter_items: Vec<FilterItem>,
    ) -> Result<PageRecordsMap> {
        let Some(partition) = self.partition.clone() else {
            return Ok(PageRecordsMap::new());
        };
        let _guard = self.op_lock.lock();
        let mut filter = Filter::new(filter_items, self.format.clone());
        filter.convert_filter_items()?;
        let hash_key_files = self.filter_hash_key_files(&partition, &self.partition_map.get_all_hash_keys(), &search_partition)?;

        let mut total = PageRecordsMap::new();
        for hash_key_file in hash_key_files {
            let pages = self.partition_map.get_by_hash(&hash_key_file);
            total.extend(self.search_pages(&pages, |page| self.search_page_delete(page, &filter)));
        }
        Ok(total)
    }

    pub fn delete(&self, filter_items: Vec<FilterItem>) -> Result<PageRecordsMap> {
        let _guard = self.op_lock.lock();
        let mut filter = Filter::new(filter_items, self.format.clone());
        filter.convert_filter_items()?;
        let pages = self.page_map.get_all();
        Ok(self.search_pages(&pages, |page| self.search_page_delete(page, &filter)))
    }

    /// Narrows partition hash-key bucket names down to those whose
    /// per-key hash segments match the keys present in `search_partition`.
    /// Each key contributes a fixed 28-character base64 SHA1 segment, so
    /// unconstrained keys are skipped by character offset rather than value.
    fn filter_hash_key_files(
        &self,
        partition: &Partition,
        hash_keys: &[String],
        search_partition: &SearchPartition,
    ) -> Result<Vec<String>> {
        const HASH_SEGMENT_LEN: usize = 28;
        let mut found = Vec::new();
        for hash_key_file in hash_keys {
            let mut offset = 0usize;
            let mut matched = true;
            for key in &partition.keys {
                if !search_partition.contains_key(key) {
                    offset += HASH_SEGMENT_LEN;
                    continue;
                }
                let mut record = PageRecord::new();
                for (k, v) in search_partition {
                    record.insert(k.clone(), v.clone());
                }
                let value_hash = self.partition_manager.get_hash_key_item(key, &record)?;
                let segment = hash_key_file.get(offset..offset + value_hash.len());
                if segment != Some(value_hash.as_str()) {
                    matched = false;
                    break;
                }
                offset += HASH_SEGMENT_LEN;
            }
            if matched {
                found.push(hash_key_file.clone());
            }
        }
        Ok(found)
    }

    fn add_records_by_partition(&self, hash_key_file: &str, insert_records: Vec<PageRecord>) -> Result<PageRecordsMap> {
        if self.partition_map.get_by_hash(hash_key_file).is_empty() {
            let page = self.page_map.add()?;
            self.partition_map.add(hash_key_file, page.file_name())?;
        }
        let mut current_page = self.partition_map.get_current_page(hash_key_file)?;
        let mut page_records = current_page.read()?;
        let mut total = PageRecordsMap::new();
        total.insert(current_page.file_name().to_string(), PageRecords::new());
        let mut indexes = crate::disk::model::IndexRecords::new();

        for insert_record in insert_records {
            if page_records.len() >= constants::MAX_PAGE_SIZE {
                current_page.write(std::mem::take(&mut page_records))?;
                current_page = self.page_map.add()?;
                self.partition_map.add(hash_key_file, current_page.file_name())?;
                total.insert(current_page.file_name().to_string(), PageRecords::new());
            }

            let record_id = Uuid::new_v4().to_string();
            page_records.insert(record_id.clone(), insert_record.clone());
            total
                .get_mut(current_page.file_name())
                .expect("inserted above")
                .insert(record_id.clone(), insert_record);
            indexes.insert(record_id, current_page.file_name().to_string());
        }
        current_page.write(page_records)?;
        self.add_indexes(indexes)?;
        Ok(total)
    }

    fn add_indexes(&self, indexes: crate::disk::model::IndexRecords) -> Result<()> {
        let mut index_file_map: HashMap<String, crate::disk::model::IndexRecords> = HashMap::new();
        let mut index_prefix_map: HashMap<String, String> = HashMap::new();

        for (page_record_id, page_file) in indexes {
            let prefix = self.index_manager.get_page_record_id_prefix(&page_record_id);
            let mut current_index = match self.index_map.get_current_index(&prefix) {
                Ok(index) => index,
                Err(_) => self.index_map.add(&page_record_id)?,
            };
            if !index_file_map.contains_key(current_index.file_name()) {
                index_file_map.insert(current_index.file_name().to_string(), current_index.read()?);
            }

            if index_file_map[current_index.file_name()].len() >= constants::MAX_INDEX_SIZE {
                current_index.write(index_file_map.remove(current_index.file_name()).expect("present"))?;
                index_prefix_map.remove(&prefix);
                current_index = self.index_map.add(&page_record_id)?;
                index_file_map.insert(current_index.file_name().to_string(), current_index.read()?);
            }

            index_prefix_map.insert(prefix.clone(), current_index.file_name().to_string());
            index_file_map
                .get_mut(current_index.file_name())
                .expect("inserted above")
                .insert(page_record_id.clone(), page_file);
        }

        for (prefix, index_file) in index_prefix_map {
            let index = self.index_map.get(&prefix, &index_file)?;
            if let Some(data) = index_file_map.remove(&index_file) {
                index.write(data)?;
            }
        }
        Ok(())
    }

    fn delete_indexes(&self, page_record_ids: &[String]) {
        let mut by_prefix: HashMap<String, Vec<String>> = HashMap::new();
        let mut indexes_by_prefix: HashMap<String, Vec<Arc<crate::maps::Index>>> = HashMap::new();

        for page_record_id in page_record_ids {
            let prefix = self.index_manager.get_page_record_id_prefix(page_record_id);
            if !by_prefix.contains_key(&prefix) {
                indexes_by_prefix.insert(prefix.clone(), self.index_map.get_by_prefix(&prefix));
                by_prefix.insert(prefix.clone(), Vec::new());
            }
            by_prefix.get_mut(&prefix).expect("inserted above").push(page_record_id.clone());
        }

        for (prefix, indexes) in indexes_by_prefix {
            let ids = &by_prefix[&prefix];
            for index in indexes {
                if let Ok(remaining) = index.delete(ids) {
                    if remaining == 0 {
                        let _ = self.index_map.delete(&prefix, index.file_name());
                    }
                }
            }
        }
    }

    /// Runs `worker` over `pages` in bounded batches so no more than
    /// `SEARCH_THREAD_COUNT` pages are scanned concurrently at once.
    fn search_pages<F>(&self, pages: &[Arc<crate::maps::Page>], worker: F) -> PageRecordsMap
    where
        F: Fn(&crate::maps::Page) -> PageRecords + Sync,
    {
        let mut total = PageRecordsMap::new();
        for batch in pages.chunks(constants::SEARCH_THREAD_COUNT) {
            let results: Vec<(String, PageRecords)> = batch
                .par_iter()
                .map(|page| (page.file_name().to_string(), worker(page)))
                .collect();
            for (file_name, group) in results {
                if !group.is_empty() {
                    total.insert(file_name, group);
                }
            }
        }
        total
    }

    fn search_page(&self, page: &crate::maps::Page, filter: &Filter) -> PageRecords {
        let mut group = PageRecords::new();
        let Ok(page_data) = page.read() else {
            return group;
        };
        let formatter = self.formatter();
        for (key, record) in page_data {
            if filter.passes(&record).unwrap_or(false) {
                if let Ok(formatted) = formatter.format_record(&record) {
                    group.insert(key, formatted);
                }
            }
        }
        group
    }

    fn search_page_update(&self, page: &crate::maps::Page, filter: &Filter, update_record: &PageRecord) -> PageRecords {
        let mut group = PageRecords::new();
        let Ok(mut page_data) = page.read() else {
            return group;
        };
        let mut affected = false;
        for (record_id, record) in page_data.clone() {
            if filter.passes(&record).unwrap_or(false) {
                let entry = page_data.get_mut(&record_id).expect("present");
                for (key, value) in update_record {
                    entry.insert(key.clone(), value.clone());
                }
                group.insert(record_id, entry.clone());
                affected = true;
            }
        }
        if affected {
            let _ = page.write(page_data);
        }
        group
    }

    fn search_page_delete(&self, page: &crate::maps::Page, filter: &Filter) -> PageRecords {
        let mut group = PageRecords::new();
        let Ok(mut page_data) = page.read() else {
            return group;
        };
        let mut affected = false;
        let mut deleted_ids = Vec::new();
        for (record_id, record) in page_data.clone() {
            if filter.passes(&record).unwrap_or(false) {
                group.insert(record_id.clone(), record);
                page_data.remove(&record_id);
                deleted_ids.push(record_id);
                affected = true;
            }
        }
        if affected {
            if page_data.is_empty() {
                if self.page_map.delete(page.file_name()).is_ok() {
                    if let Some(partition) = &self.partition {
                        if let Some(first_record) = deleted_ids.first().and_then(|id| group.get(id)) {
                            if let Ok(hash_key) = self.partition_manager.get_hash_key(partition, first_record) {
                                let _ = self.partition_map.delete(&hash_key, page.file_name());
                            }
                        }
                    }
                }
            } else if page.write(page_data).is_err() {
                return group;
            }
            self.delete_indexes(&deleted_ids);
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::model::{FormatItem, KeyType};
    use crate::fs::OsFileSystem;
    use serde_json::json;

    fn new_blob_map(root: &std::path::Path, db: &str) -> BlobMap {
        std::fs::create_dir_all(root.join(db)).unwrap();
        BlobMap::new(db, root.to_path_buf(), Arc::new(OsFileSystem), true)
    }

    fn simple_format() -> Format {
        let mut format = Format::new();
        format.insert("name".to_string(), FormatItem { key_type: KeyType::String });
        format.insert("age".to_string(), FormatItem { key_type: KeyType::Int });
        format
    }

    #[test]
    fn add_and_full_scan_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        let blob = blob_map.add("customers", simple_format(), None).unwrap();

        let mut record = PageRecord::new();
        record.insert("name".to_string(), json!("Ada"));
        record.insert("age".to_string(), json!(30));
        blob.add(vec![record]).unwrap();

        let found = blob.get_full_scan(Vec::new()).unwrap();
        let all_records: Vec<&PageRecord> = found.values().flat_map(|page| page.values()).collect();
        assert_eq!(all_records.len(), 1);
        assert_eq!(all_records[0]["name"], json!("Ada"));
    }

    #[test]
    fn update_by_filter_changes_matching_records_only() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        let blob = blob_map.add("customers", simple_format(), None).unwrap();

        for (name, age) in [("Ada", 30), ("Grace", 40)] {
            let mut record = PageRecord::new();
            record.insert("name".to_string(), json!(name));
            record.insert("age".to_string(), json!(age));
            blob.add(vec![record]).unwrap();
        }

        let mut update = PageRecord::new();
        update.insert("age".to_string(), json!(31));
        let filter = vec![FilterItem {
            key: "name".to_string(),
            op: "=".to_string(),
            value: json!("Ada"),
        }];
        let updated = blob.update(update, filter).unwrap();
        let updated_records: Vec<&PageRecord> = updated.values().flat_map(|page| page.values()).collect();
        assert_eq!(updated_records.len(), 1);
        assert_eq!(updated_records[0]["age"], json!(31));

        let remaining = blob.get_full_scan(Vec::new()).unwrap();
        let ages: Vec<i64> = remaining
            .values()
            .flat_map(|page| page.values())
            .map(|record| record["age"].as_i64().unwrap())
            .collect();
        assert!(ages.contains(&31));
        assert!(ages.contains(&40));
    }

    #[test]
    fn delete_by_filter_removes_only_matching_records() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        let blob = blob_map.add("customers", simple_format(), None).unwrap();

        for (name, age) in [("Ada", 30), ("Grace", 40)] {
            let mut record = PageRecord::new();
            record.insert("name".to_string(), json!(name));
            record.insert("age".to_string(), json!(age));
            blob.add(vec![record]).unwrap();
        }

        let filter = vec![FilterItem {
            key: "name".to_string(),
            op: "=".to_string(),
            value: json!("Ada"),
        }];
        let deleted = blob.delete(filter).unwrap();
        assert_eq!(deleted.values().flat_map(|page| page.values()).count(), 1);

        let remaining = blob.get_full_scan(Vec::new()).unwrap();
        assert_eq!(remaining.values().flat_map(|page| page.values()).count(), 1);
    }

    #[test]
    fn partitioned_blob_filters_by_hash_key() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        let partition = Partition { keys: vec!["name".to_string()] };
        let blob = blob_map.add("customers", simple_format(), Some(partition)).unwrap();

        for (name, age) in [("Ada", 30), ("Grace", 40)] {
            let mut record = PageRecord::new();
            record.insert("name".to_string(), json!(name));
            record.insert("age".to_string(), json!(age));
            blob.add_with_partition(vec![record]).unwrap();
        }

        let mut search_partition = SearchPartition::new();
        search_partition.insert("name".to_string(), json!("Ada"));
        let found = blob.get_by_partition(search_partition, Vec::new()).unwrap();
        let records: Vec<&PageRecord> = found.values().flat_map(|page| page.values()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], json!("Ada"));
    }

    #[test]
    fn get_blob_map_deletes_underlying_blob() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        blob_map.add("customers", simple_format(), None).unwrap();
        blob_map.delete("customers").unwrap();
        assert!(blob_map.get("customers").is_err());
    }

    #[test]
    fn add_rejects_duplicate_blob_name() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        blob_map.add("customers", simple_format(), None).unwrap();
        let err = blob_map.add("customers", simple_format(), None).unwrap_err();
        assert!(matches!(err, DbError::Exists(_)));
    }

    #[test]
    fn add_rotates_page_before_exceeding_max_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let blob_map = new_blob_map(dir.path(), "shop");
        let blob = blob_map.add("customers", simple_format(), None).unwrap();

        let records: Vec<PageRecord> = (0..(constants::MAX_PAGE_SIZE + 5))
            .map(|i| {
                let mut record = PageRecord::new();
                record.insert("name".to_string(), json!(format!("user-{i}")));
                record.insert("age".to_string(), json!(20));
                record
            })
            .collect();
        blob.add(records).unwrap();

        for page in blob.page_map.get_all() {
            assert!(page.read().unwrap().len() <= constants::MAX_PAGE_SIZE);
        }
    }
}
