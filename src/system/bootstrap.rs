//! Creates the reserved `sys` database and its blobs on first startup.

use crate::disk::model::{FormatItem, KeyType};
use crate::error::Result;
use crate::operation::OperationManager;

use super::constants::{BLOB_SYS_LOG, BLOB_SYS_USER, DB_SYS};

/// Idempotent: safe to call on every engine startup.
pub fn init_db(operation: &OperationManager) -> Result<()> {
    if !operation.db_exists(DB_SYS) {
        operation.create_db(DB_SYS)?;
    }
    if !operation.blob_exists(DB_SYS, BLOB_SYS_LOG) {
        let mut format = crate::disk::model::Format::new();
        format.insert("is_current".to_string(), FormatItem { key_type: KeyType::Bool });
        format.insert("version".to_string(), FormatItem { key_type: KeyType::Int });
        format.insert("query_hex".to_string(), FormatItem { key_type: KeyType::String });
        operation.create_blob(DB_SYS, BLOB_SYS_LOG, format, None)?;
    }
    if !operation.blob_exists(DB_SYS, BLOB_SYS_USER) {
        let mut format = crate::disk::model::Format::new();
        format.insert("user".to_string(), FormatItem { key_type: KeyType::String });
        format.insert("permission".to_string(), FormatItem { key_type: KeyType::String });
        format.insert("password".to_string(), FormatItem { key_type: KeyType::String });
        operation.create_blob(DB_SYS, BLOB_SYS_USER, format, None)?;
    }
    Ok(())
}
