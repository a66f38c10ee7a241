//! Accounts stored in `sys.sys_user`. Passwords never leave this module:
//! every record handed back to a caller has the field stripped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::ID_KEY;
use crate::disk::model::PageRecord;
use crate::error::{DbError, Result};
use crate::filter::FilterItem;
use crate::operation::OperationManager;

use super::constants::{BLOB_SYS_USER, DB_SYS, PERMISSION_SUPER};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConnection {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub user: String,
    pub permission: String,
    pub password: String,
}

impl User {
    fn from_page_record(record: &PageRecord) -> Result<Self> {
        let id = record
            .get(ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let user = record
            .get("user")
            .and_then(Value::as_str)
            .ok_or_else(|| DbError::Corruption("user record missing user".to_string()))?
            .to_string();
        let permission = record
            .get("permission")
            .and_then(Value::as_str)
            .ok_or_else(|| DbError::Corruption("user record missing permission".to_string()))?
            .to_string();
        let password = record
            .get("password")
            .and_then(Value::as_str)
            .ok_or_else(|| DbError::Corruption("user record missing password".to_string()))?
            .to_string();
        Ok(Self {
            id,
            user,
            permission,
            password,
        })
    }

    fn to_storage_record(&self) -> PageRecord {
        let mut record = PageRecord::new();
        record.insert("user".to_string(), Value::String(self.user.clone()));
        record.insert("permission".to_string(), Value::String(self.permission.clone()));
        record.insert("password".to_string(), Value::String(self.password.clone()));
        record
    }

    /// Drops the password so the record is safe to hand back to a caller.
    pub fn convert_to_page_record(&self) -> PageRecord {
        let mut record = self.to_storage_record();
        record.remove("password");
        record.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        record
    }
}

pub struct UserManager {
    operation: Arc<OperationManager>,
}

impl UserManager {
    pub fn new(operation: Arc<OperationManager>) -> Self {
        Self { operation }
    }

    /// Creates the `root` account with super permission if it doesn't
    /// already exist. Safe to call on every startup.
    pub fn init_root(&self, password: &str) -> Result<User> {
        let existing = self.get_users(vec![FilterItem {
            key: "user".to_string(),
            op: "=".to_string(),
            value: Value::String("root".to_string()),
        }])?;
        if let Some(root) = existing.into_iter().next() {
            return Ok(root);
        }
        let root = User {
            id: String::new(),
            user: "root".to_string(),
            permission: PERMISSION_SUPER.to_string(),
            password: password.to_string(),
        };
        let inserted = self
            .operation
            .add_records(DB_SYS, BLOB_SYS_USER, vec![root.to_storage_record()])?;
        let record = inserted
            .into_iter()
            .next()
            .ok_or_else(|| DbError::Corruption("root account failed to insert".to_string()))?;
        User::from_page_record(&record)
    }

    pub fn authenticate(&self, user: &str, password: &str) -> Result<User> {
        let matches = self.get_users(vec![FilterItem {
            key: "user".to_string(),
            op: "=".to_string(),
            value: Value::String(user.to_string()),
        }])?;
        let found = matches
            .into_iter()
            .next()
            .ok_or_else(|| DbError::AuthFailed(format!("user {user} not found")))?;
        if found.password != password {
            return Err(DbError::AuthFailed(format!("invalid password for user {user}")));
        }
        Ok(found)
    }

    pub fn get_users(&self, filter_items: Vec<FilterItem>) -> Result<Vec<User>> {
        let records = self.operation.get_records(DB_SYS, BLOB_SYS_USER, None, filter_items)?;
        records.iter().map(User::from_page_record).collect()
    }
}
