// File primitives shared by every disk manager. Managers depend on this
// trait rather than calling `std::fs` directly, so tests and higher
// layers can substitute a double.

use std::path::Path;

use crate::error::Result;

/// Directory permission used for every directory the engine creates.
/// Owner read/write/execute so directories stay listable and traversable.
#[cfg(unix)]
pub const DIR_MODE: u32 = 0o700;

pub trait FileSystem: Send + Sync {
    fn create_dir(&self, path: &Path) -> Result<()>;
    fn delete_dir_recursive(&self, path: &Path) -> Result<()>;
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;
    fn create_file(&self, path: &Path) -> Result<()>;
    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()>;
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    /// Deletes a file. Returns `true` ("phantom") when the file was
    /// already absent — callers treat that as a non-fatal signal to keep
    /// cleaning up in-memory bookkeeping rather than an error.
    fn delete_file(&self, path: &Path) -> Result<bool>;
    fn new_uuid(&self) -> String;
    fn exists(&self, path: &Path) -> bool;
}

/// Production `FileSystem` backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn create_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(DIR_MODE);
            std::fs::set_permissions(path, perms)?;
        }
        Ok(())
    }

    fn delete_dir_recursive(&self, path: &Path) -> Result<()> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn create_file(&self, path: &Path) -> Result<()> {
        std::fs::File::create(path)?;
        Ok(())
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn delete_file(&self, path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    fn new_uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_dir_then_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("db");
        let fs = OsFileSystem;
        fs.create_dir(&sub).unwrap();
        assert!(fs.exists(&sub));
        fs.create_file(&sub.join("a.json")).unwrap();
        fs.write_file(&sub.join("a.json"), b"{}").unwrap();
        assert_eq!(fs.read_file(&sub.join("a.json")).unwrap(), b"{}");
        assert_eq!(fs.list_dir(&sub).unwrap(), vec!["a.json".to_string()]);
        fs.delete_dir_recursive(&sub).unwrap();
        assert!(!fs.exists(&sub));
    }

    #[test]
    fn delete_file_is_phantom_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFileSystem;
        let phantom = fs.delete_file(&dir.path().join("missing.json")).unwrap();
        assert!(phantom);
    }

    #[test]
    fn new_uuid_is_unique() {
        let fs = OsFileSystem;
        assert_ne!(fs.new_uuid(), fs.new_uuid());
    }
}
