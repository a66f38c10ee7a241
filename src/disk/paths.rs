use std::path::{Path, PathBuf};

pub fn db_dir(root: &Path, db: &str) -> PathBuf {
    root.join(db)
}

pub fn blob_dir(root: &Path, db: &str, blob: &str) -> PathBuf {
    root.join(db).join(blob)
}

pub fn format_file(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("format.json")
}

pub fn pages_file(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("pages.json")
}

pub fn pages_dir(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("pages")
}

pub fn page_path(root: &Path, db: &str, blob: &str, file_name: &str) -> PathBuf {
    pages_dir(root, db, blob).join(file_name)
}

pub fn indexes_file(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("indexes.json")
}

pub fn indexes_dir(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("indexes")
}

pub fn index_path(root: &Path, db: &str, blob: &str, file_name: &str) -> PathBuf {
    indexes_dir(root, db, blob).join(file_name)
}

pub fn partitions_file(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("partitions.json")
}

pub fn partitions_dir(root: &Path, db: &str, blob: &str) -> PathBuf {
    blob_dir(root, db, blob).join("partitions")
}

pub fn partition_hash_path(root: &Path, db: &str, blob: &str, hash_key_file: &str) -> PathBuf {
    partitions_dir(root, db, blob).join(hash_key_file)
}
