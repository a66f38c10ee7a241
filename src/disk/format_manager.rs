use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;

use super::model::Format;
use super::{paths, read_json, write_json};

pub struct FormatManager {
    data_location: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FormatManager {
    pub fn new(data_location: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { data_location, fs }
    }

    pub fn create(&self, db: &str, blob: &str, format: &Format) -> Result<()> {
        let path = paths::format_file(&self.data_location, db, blob);
        self.fs.create_file(&path)?;
        write_json(self.fs.as_ref(), &path, format)
    }

    pub fn get(&self, db: &str, blob: &str) -> Result<Format> {
        let path = paths::format_file(&self.data_location, db, blob);
        read_json(self.fs.as_ref(), &path)
    }
}
