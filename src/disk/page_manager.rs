use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;

use super::model::{PageItem, PageRecords, Pages};
use super::{paths, read_json, write_json};

pub struct PageManager {
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl PageManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { data_location, fs }
    }

    /// Creates `pages.json` and the `pages/` directory. A failed write
    /// here is a real error, propagated to the caller rather than
    /// silently discarded.
    pub fn initialize(&self, db: &str, blob: &str) -> Result<()> {
        let file = paths::pages_file(&self.data_location, db, blob);
        self.fs.create_file(&file)?;
        write_json(self.fs.as_ref(), &file, &Pages::new())?;
        self.fs
            .create_dir(&paths::pages_dir(&self.data_location, db, blob))
    }

    /// Allocates a new, empty page file and registers it in `pages.json`.
    /// Cleans up the orphaned page file itself on any failure past its
    /// creation, so callers never need to roll back a partial allocation.
    pub fn create(&self, db: &str, blob: &str) -> Result<String> {
        let file_name = format!("{}.json", self.fs.new_uuid());
        let page_path = paths::page_path(&self.data_location, db, blob, &file_name);
        self.fs.create_file(&page_path)?;

        let write_empty = write_json(self.fs.as_ref(), &page_path, &PageRecords::new());
        if let Err(e) = write_empty {
            let _ = self.fs.delete_file(&page_path);
            return Err(e);
        }

        match self.register(db, blob, &file_name) {
            Ok(()) => Ok(file_name),
            Err(e) => {
                let _ = self.fs.delete_file(&page_path);
                Err(e)
            }
        }
    }

    fn register(&self, db: &str, blob: &str, file_name: &str) -> Result<()> {
        let mut pages = self.get_all(db, blob)?;
        pages.push(PageItem {
            file_name: file_name.to_string(),
        });
        write_json(
            self.fs.as_ref(),
            &paths::pages_file(&self.data_location, db, blob),
            &pages,
        )
    }

    pub fn get_all(&self, db: &str, blob: &str) -> Result<Pages> {
        read_json(
            self.fs.as_ref(),
            &paths::pages_file(&self.data_location, db, blob),
        )
    }

    pub fn get_data(&self, db: &str, blob: &str, page_file: &str) -> Result<PageRecords> {
        read_json(
            self.fs.as_ref(),
            &paths::page_path(&self.data_location, db, blob, page_file),
        )
    }

    pub fn write_data(&self, db: &str, blob: &str, page_file: &str, data: &PageRecords) -> Result<()> {
        write_json(
            self.fs.as_ref(),
            &paths::page_path(&self.data_location, db, blob, page_file),
            data,
        )
    }

    /// Removes `page_file` from `pages.json` and deletes it from disk.
    /// Returns `true` ("phantom") when the file was already absent.
    pub fn delete(&self, db: &str, blob: &str, page_file: &str) -> Result<bool> {
        let mut pages = self.get_all(db, blob)?;
        if let Some(pos) = pages.iter().position(|p| p.file_name == page_file) {
            pages.remove(pos);
            write_json(
                self.fs.as_ref(),
                &paths::pages_file(&self.data_location, db, blob),
                &pages,
            )?;
        }
        self.fs
            .delete_file(&paths::page_path(&self.data_location, db, blob, page_file))
    }
}
