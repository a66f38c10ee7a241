use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::error::{DbError, Result};
use crate::fs::FileSystem;

use super::model::{PageRecord, Partition, PartitionPageItem, PartitionPages};
use super::{paths, read_json, write_json};

pub struct PartitionManager {
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl PartitionManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { data_location, fs }
    }

    pub fn initialize(&self, db: &str, blob: &str, partition: &Partition) -> Result<()> {
        let file = paths::partitions_file(&self.data_location, db, blob);
        self.fs.create_file(&file)?;
        write_json(self.fs.as_ref(), &file, partition)?;
        self.fs
            .create_dir(&paths::partitions_dir(&self.data_location, db, blob))
    }

    /// Appends `page_file_name` to the hash-key bucket, creating the bucket
    /// file first if it doesn't exist yet. No-op if the page is already
    /// listed in the bucket.
    pub fn add_page(&self, db: &str, blob: &str, hash_key_file_name: &str, page_file_name: &str) -> Result<()> {
        let mut pages = match self.get_by_hash_key(db, blob, hash_key_file_name) {
            Ok(pages) => pages,
            Err(_) => self.create_hash_key(db, blob, hash_key_file_name)?,
        };

        if pages.iter().any(|p| p.file_name == page_file_name) {
            return Ok(());
        }

        pages.push(PartitionPageItem {
            file_name: page_file_name.to_string(),
        });
        write_json(
            self.fs.as_ref(),
            &paths::partition_hash_path(&self.data_location, db, blob, hash_key_file_name),
            &pages,
        )
    }

    pub fn get_partition(&self, db: &str, blob: &str) -> Result<Partition> {
        read_json(
            self.fs.as_ref(),
            &paths::partitions_file(&self.data_location, db, blob),
        )
    }

    pub fn get_by_hash_key(&self, db: &str, blob: &str, hash_key_file_name: &str) -> Result<PartitionPages> {
        read_json(
            self.fs.as_ref(),
            &paths::partition_hash_path(&self.data_location, db, blob, hash_key_file_name),
        )
    }

    pub fn get_all(&self, db: &str, blob: &str) -> Result<Vec<String>> {
        self.fs
            .list_dir(&paths::partitions_dir(&self.data_location, db, blob))
    }

    pub fn remove(&self, db: &str, blob: &str, hash_key_file_name: &str, page_file_name: &str) -> Result<()> {
        let mut pages = self.get_by_hash_key(db, blob, hash_key_file_name)?;
        if let Some(pos) = pages.iter().position(|p| p.file_name == page_file_name) {
            pages.remove(pos);
            write_json(
                self.fs.as_ref(),
                &paths::partition_hash_path(&self.data_location, db, blob, hash_key_file_name),
                &pages,
            )?;
        }
        Ok(())
    }

    pub fn delete(&self, db: &str, blob: &str, hash_key_file_name: &str) -> Result<bool> {
        self.fs
            .delete_file(&paths::partition_hash_path(&self.data_location, db, blob, hash_key_file_name))
    }

    pub fn get_hash_key(&self, partition: &Partition, page_record: &PageRecord) -> Result<String> {
        let mut hash_key = String::new();
        for key in &partition.keys {
            hash_key.push_str(&self.get_hash_key_item(key, page_record)?);
        }
        Ok(format!("{hash_key}.json"))
    }

    /// Hashes the value stored under `partition_key` in `page_record` with
    /// SHA1 and encodes it URL-safe base64. Numbers and bools are hashed by
    /// their display form so the same logical value always maps to the
    /// same bucket regardless of how it arrived in the record.
    pub fn get_hash_key_item(&self, partition_key: &str, page_record: &PageRecord) -> Result<String> {
        let value = page_record
            .get(partition_key)
            .ok_or_else(|| DbError::NotFound(format!("{partition_key} not found in page record")))?;

        let mut hasher = Sha1::new();
        hasher.update(value_display(value).as_bytes());
        Ok(URL_SAFE.encode(hasher.finalize()))
    }

    pub fn create_hash_key(&self, db: &str, blob: &str, hash_key_file_name: &str) -> Result<PartitionPages> {
        let path = paths::partition_hash_path(&self.data_location, db, blob, hash_key_file_name);
        self.fs.create_file(&path)?;
        let pages: PartitionPages = Vec::new();
        write_json(self.fs.as_ref(), &path, &pages)?;
        Ok(pages)
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_key_item_is_stable_for_equal_strings() {
        let fs = Arc::new(crate::fs::OsFileSystem);
        let manager = PartitionManager::new(PathBuf::from("/tmp"), fs);
        let mut record: PageRecord = PageRecord::new();
        record.insert("region".to_string(), json!("us-east"));

        let a = manager.get_hash_key_item("region", &record).unwrap();
        let b = manager.get_hash_key_item("region", &record).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_key_item_missing_key_errors() {
        let fs = Arc::new(crate::fs::OsFileSystem);
        let manager = PartitionManager::new(PathBuf::from("/tmp"), fs);
        let record: PageRecord = PageRecord::new();
        assert!(manager.get_hash_key_item("region", &record).is_err());
    }
}
