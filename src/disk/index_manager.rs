use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;

use super::model::{IndexRecords, Indexes};
use super::{paths, read_json, write_json};

const INDEX_PREFIX_LENGTH: usize = 1;

pub struct IndexManager {
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl IndexManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { data_location, fs }
    }

    pub fn initialize(&self, db: &str, blob: &str) -> Result<()> {
        let file = paths::indexes_file(&self.data_location, db, blob);
        self.fs.create_file(&file)?;
        write_json(self.fs.as_ref(), &file, &Indexes::new())?;
        self.fs
            .create_dir(&paths::indexes_dir(&self.data_location, db, blob))
    }

    /// Allocates a new, empty index file under the prefix bucket of
    /// `page_record_id` and registers it in `indexes.json`.
    pub fn create(&self, db: &str, blob: &str, page_record_id: &str) -> Result<String> {
        let file_name = format!("{}.json", self.fs.new_uuid());
        let index_path = paths::index_path(&self.data_location, db, blob, &file_name);
        self.fs.create_file(&index_path)?;

        let write_empty = write_json(self.fs.as_ref(), &index_path, &IndexRecords::new());
        if let Err(e) = write_empty {
            let _ = self.fs.delete_file(&index_path);
            return Err(e);
        }

        match self.register(db, blob, page_record_id, &file_name) {
            Ok(()) => Ok(file_name),
            Err(e) => {
                let _ = self.fs.delete_file(&index_path);
                Err(e)
            }
        }
    }

    fn register(&self, db: &str, blob: &str, page_record_id: &str, file_name: &str) -> Result<()> {
        let mut indexes = self.get_all(db, blob)?;
        let prefix = self.get_page_record_id_prefix(page_record_id);
        indexes.entry(prefix).or_default().file_names.push(file_name.to_string());
        write_json(
            self.fs.as_ref(),
            &paths::indexes_file(&self.data_location, db, blob),
            &indexes,
        )
    }

    pub fn get_all(&self, db: &str, blob: &str) -> Result<Indexes> {
        read_json(
            self.fs.as_ref(),
            &paths::indexes_file(&self.data_location, db, blob),
        )
    }

    pub fn get_data(&self, db: &str, blob: &str, index_file: &str) -> Result<IndexRecords> {
        read_json(
            self.fs.as_ref(),
            &paths::index_path(&self.data_location, db, blob, index_file),
        )
    }

    pub fn write_data(&self, db: &str, blob: &str, index_file: &str, data: &IndexRecords) -> Result<()> {
        write_json(
            self.fs.as_ref(),
            &paths::index_path(&self.data_location, db, blob, index_file),
            data,
        )
    }

    /// Removes `index_file` from its prefix bucket in `indexes.json` and
    /// deletes it from disk. Returns `true` ("phantom") when the file was
    /// already absent.
    pub fn delete(&self, db: &str, blob: &str, index_file: &str) -> Result<bool> {
        let mut indexes = self.get_all(db, blob)?;
        let mut changed = false;
        for item in indexes.values_mut() {
            if let Some(pos) = item.file_names.iter().position(|f| f == index_file) {
                item.file_names.remove(pos);
                changed = true;
                break;
            }
        }
        if changed {
            write_json(
                self.fs.as_ref(),
                &paths::indexes_file(&self.data_location, db, blob),
                &indexes,
            )?;
        }
        self.fs
            .delete_file(&paths::index_path(&self.data_location, db, blob, index_file))
    }

    pub fn get_page_record_id_prefix(&self, page_record_id: &str) -> String {
        page_record_id.chars().take(INDEX_PREFIX_LENGTH).collect()
    }
}
