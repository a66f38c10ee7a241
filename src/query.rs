//! Query dispatch: the wire-level `action`/`on` pairs the engine accepts,
//! routed to `OperationManager` for ordinary databases and to the system
//! managers for the reserved `sys` database.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::disk::model::{Format, FormatItem, PageRecord, Partition};
use crate::error::Result;
use crate::filter::{FilterItem, SearchPartition};
use crate::operation::OperationManager;
use crate::system::constants::is_system_name;
use crate::system::user::UserConnection;
use crate::system::{Log, LogManager, UserManager};

pub mod constants {
    pub const ACTION_CREATE: &str = "create";
    pub const ACTION_DELETE: &str = "delete";
    pub const ACTION_UPDATE: &str = "update";
    pub const ACTION_GET: &str = "get";

    pub const ON_DB: &str = "db";
    pub const ON_BLOB: &str = "blob";
    pub const ON_DATA: &str = "data";
    pub const ON_LOGS: &str = "logs";
    pub const ON_USERS: &str = "users";
    pub const ON_CONNECTION: &str = "connection";
}
use constants::*;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct With {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_record: Option<PageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<PageRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_partition: Option<SearchPartition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<FilterItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_connection: Option<UserConnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub action: String,
    pub on: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub with: With,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<PageRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QueryResult {
    fn error(message: impl Into<String>) -> Self {
        Self {
            records: None,
            error_message: Some(message.into()),
        }
    }

    fn ok(records: Vec<PageRecord>) -> Self {
        Self {
            records: Some(records),
            error_message: None,
        }
    }

    fn from_result(result: Result<Vec<PageRecord>>) -> Self {
        match result {
            Ok(records) => Self::ok(records),
            Err(err) => Self::error(err.to_string()),
        }
    }
}

struct NameSplit {
    db: String,
    blob: String,
}

fn split_name(name: &str) -> std::result::Result<NameSplit, String> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 2 {
        return Err(format!("{name} is not valid"));
    }
    Ok(NameSplit {
        db: parts[0].to_string(),
        blob: parts[1].to_string(),
    })
}

fn build_format(format: Option<HashMap<String, String>>) -> Format {
    format
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, key_type)| {
            serde_json::from_value(serde_json::Value::String(key_type))
                .ok()
                .map(|key_type| (key, FormatItem { key_type }))
        })
        .collect()
}

fn build_partition(partition: Option<Vec<String>>) -> Option<Partition> {
    match partition {
        Some(keys) if !keys.is_empty() => Some(Partition { keys }),
        _ => None,
    }
}

/// Routes `create`/`delete`/`update`/`get` queries against ordinary
/// (non-system) databases and blobs.
pub struct QueryManager {
    operation: Arc<OperationManager>,
}

impl QueryManager {
    pub fn new(operation: Arc<OperationManager>) -> Self {
        Self { operation }
    }

    pub fn query(&self, query: &Query) -> QueryResult {
        match query.action.as_str() {
            ACTION_CREATE => self.handle_create(query),
            ACTION_DELETE => self.handle_delete(query),
            ACTION_UPDATE => self.handle_update(query),
            ACTION_GET => self.handle_get(query),
            other => QueryResult::error(format!("action {other} does not exist")),
        }
    }

    fn handle_create(&self, query: &Query) -> QueryResult {
        match query.on.as_str() {
            ON_DB => QueryResult::from_result(self.operation.create_db(&query.name).map(|_| Vec::new())),
            ON_BLOB => {
                let name_split = match split_name(&query.name) {
                    Ok(n) => n,
                    Err(message) => return QueryResult::error(message),
                };
                if is_system_name(&name_split.db) {
                    return QueryResult::error("cannot use system database");
                }
                let format = build_format(query.with.format.clone());
                let partition = build_partition(query.with.partition.clone());
                QueryResult::from_result(
                    self.operation
                        .create_blob(&name_split.db, &name_split.blob, format, partition)
                        .map(|_| Vec::new()),
                )
            }
            ON_DATA => {
                let name_split = match split_name(&query.name) {
                    Ok(n) => n,
                    Err(message) => return QueryResult::error(message),
                };
                if is_system_name(&name_split.db) {
                    return QueryResult::error("cannot use system database");
                }
                let records = query.with.records.clone().unwrap_or_default();
                QueryResult::from_result(self.operation.add_records(&name_split.db, &name_split.blob, records))
            }
            other => QueryResult::error(format!("{other} not allowed on action {}", query.action)),
        }
    }

    fn handle_delete(&self, query: &Query) -> QueryResult {
        match query.on.as_str() {
            ON_DB => {
                if is_system_name(&query.name) {
                    return QueryResult::error("cannot use system database");
                }
                QueryResult::from_result(self.operation.delete_db(&query.name).map(|_| Vec::new()))
            }
            ON_BLOB => {
                let name_split = match split_name(&query.name) {
                    Ok(n) => n,
                    Err(message) => return QueryResult::error(message),
                };
                if is_system_name(&name_split.db) {
                    return QueryResult::error("cannot use system database");
                }
                QueryResult::from_result(
                    self.operation
                        .delete_blob(&name_split.db, &name_split.blob)
                        .map(|_| Vec::new()),
                )
            }
            ON_DATA => {
                let name_split = match split_name(&query.name) {
                    Ok(n) => n,
                    Err(message) => return QueryResult::error(message),
                };
                if is_system_name(&name_split.db) {
                    return QueryResult::error("cannot use system database");
                }
                let result = match &query.with.index {
                    Some(index) if !index.is_empty() => {
                        self.operation.delete_record_by_index(&name_split.db, &name_split.blob, index)
                    }
                    _ => self.operation.delete_records(
                        &name_split.db,
                        &name_split.blob,
                        query.with.search_partition.clone(),
                        query.with.filter.clone().unwrap_or_default(),
                    ),
                };
                QueryResult::from_result(result)
            }
            other => QueryResult::error(format!("{other} not allowed on action {}", query.action)),
        }
    }

    fn handle_update(&self, query: &Query) -> QueryResult {
        match query.on.as_str() {
            ON_DATA => {
                let name_split = match split_name(&query.name) {
                    Ok(n) => n,
                    Err(message) => return QueryResult::error(message),
                };
                if is_system_name(&name_split.db) {
                    return QueryResult::error("cannot use system database");
                }
                let update_record = query.with.update_record.clone().unwrap_or_default();
                let result = match &query.with.index {
                    Some(index) if !index.is_empty() => self.operation.update_record_by_index(
                        &name_split.db,
                        &name_split.blob,
                        index,
                        update_record,
                    ),
                    _ => self.operation.update_records(
                        &name_split.db,
                        &name_split.blob,
                        update_record,
                        query.with.search_partition.clone(),
                        query.with.filter.clone().unwrap_or_default(),
                    ),
                };
                QueryResult::from_result(result)
            }
            other => QueryResult::error(format!("{other} not allowed on action {}", query.action)),
        }
    }

    fn handle_get(&self, query: &Query) -> QueryResult {
        match query.on.as_str() {
            ON_DATA => {
                let name_split = match split_name(&query.name) {
                    Ok(n) => n,
                    Err(message) => return QueryResult::error(message),
                };
                let result = match &query.with.index {
                    Some(index) if !index.is_empty() => self
                        .operation
                        .get_record_by_index(&name_split.db, &name_split.blob, index),
                    _ => self.operation.get_records(
                        &name_split.db,
                        &name_split.blob,
                        query.with.search_partition.clone(),
                        query.with.filter.clone().unwrap_or_default(),
                    ),
                };
                QueryResult::from_result(result)
            }
            other => QueryResult::error(format!("{other} not allowed on action {}", query.action)),
        }
    }
}

/// Routes queries against the reserved `sys` database: log/user reads and
/// the `connection` action used to authenticate.
pub struct SystemQueryManager {
    log_manager: Arc<LogManager>,
    user_manager: Arc<UserManager>,
}

impl SystemQueryManager {
    pub fn new(log_manager: Arc<LogManager>, user_manager: Arc<UserManager>) -> Self {
        Self { log_manager, user_manager }
    }

    pub fn query(&self, query: &Query) -> QueryResult {
        match query.action.as_str() {
            ACTION_CREATE => self.handle_create(query),
            ACTION_GET => self.handle_get(query),
            other => QueryResult::error(format!("action {other} does not exist")),
        }
    }

    fn handle_get(&self, query: &Query) -> QueryResult {
        let filter = query.with.filter.clone().unwrap_or_default();
        match query.on.as_str() {
            ON_LOGS => match self.log_manager.get_logs(filter) {
                Ok(logs) => QueryResult::ok(logs.iter().map(Log::convert_to_page_record).collect()),
                Err(err) => QueryResult::error(err.to_string()),
            },
            ON_USERS => match self.user_manager.get_users(filter) {
                Ok(users) => QueryResult::ok(users.iter().map(|u| u.convert_to_page_record()).collect()),
                Err(err) => QueryResult::error(err.to_string()),
            },
            other => QueryResult::error(format!("{other} not allowed on action {}", query.action)),
        }
    }

    fn handle_create(&self, query: &Query) -> QueryResult {
        match query.on.as_str() {
            ON_CONNECTION => {
                let Some(connection) = &query.with.user_connection else {
                    return QueryResult::error("user_connection not allowed on action connection".to_string());
                };
                match self.user_manager.authenticate(&connection.user, &connection.password) {
                    Ok(user) => QueryResult::ok(vec![user.convert_to_page_record()]),
                    Err(err) => QueryResult::error(err.to_string()),
                }
            }
            other => QueryResult::error(format!("{other} not allowed on action {}", query.action)),
        }
    }
}

impl QueryResult {
    /// Used by callers that only want a success/failure signal.
    pub fn is_ok(&self) -> bool {
        self.error_message.is_none()
    }
}
