//! Append-only audit trail of every mutating query accepted against a
//! non-system database, stored in `sys.sys_log`. Each entry carries the
//! hex-encoded JSON of the query that produced it.

use std::sync::Arc;

use serde_json::Value;

use crate::constants::ID_KEY;
use crate::disk::model::PageRecord;
use crate::error::{DbError, Result};
use crate::filter::FilterItem;
use crate::operation::OperationManager;
use crate::query::Query;

use super::constants::{BLOB_SYS_LOG, DB_SYS};

#[derive(Debug, Clone)]
pub struct Log {
    pub id: String,
    pub version: i64,
    pub is_current: bool,
    pub query: Query,
}

impl Log {
    fn from_page_record(record: &PageRecord) -> Result<Self> {
        let id = record
            .get(ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let version = record
            .get("version")
            .and_then(Value::as_i64)
            .ok_or_else(|| DbError::Corruption("log record missing version".to_string()))?;
        let is_current = record
            .get("is_current")
            .and_then(Value::as_bool)
            .ok_or_else(|| DbError::Corruption("log record missing is_current".to_string()))?;
        let query_hex = record
            .get("query_hex")
            .and_then(Value::as_str)
            .ok_or_else(|| DbError::Corruption("log record missing query_hex".to_string()))?;
        let query_bytes =
            hex::decode(query_hex).map_err(|err| DbError::Corruption(format!("log query_hex is not valid hex: {err}")))?;
        let query: Query = serde_json::from_slice(&query_bytes)
            .map_err(|err| DbError::Corruption(format!("log query_hex is not a valid query: {err}")))?;
        Ok(Self {
            id,
            version,
            is_current,
            query,
        })
    }

    fn to_storage_record(&self) -> Result<PageRecord> {
        let query_json = serde_json::to_vec(&self.query)
            .map_err(|err| DbError::Corruption(format!("query not serializable: {err}")))?;
        let mut record = PageRecord::new();
        record.insert("version".to_string(), Value::from(self.version));
        record.insert("is_current".to_string(), Value::Bool(self.is_current));
        record.insert("query_hex".to_string(), Value::String(hex::encode(query_json)));
        Ok(record)
    }

    pub fn convert_to_page_record(&self) -> PageRecord {
        let mut record = self.to_storage_record().unwrap_or_default();
        record.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        record
    }
}

pub struct LogManager {
    operation: Arc<OperationManager>,
}

impl LogManager {
    pub fn new(operation: Arc<OperationManager>) -> Self {
        Self { operation }
    }

    /// Appends `query` as the new current log entry, retiring whichever
    /// entry held that title before.
    pub fn add_log(&self, query: &Query) -> Result<()> {
        let current = self.try_get_current()?;
        if let Some(mut current) = current {
            current.is_current = false;
            let record = current.to_storage_record()?;
            self.operation
                .update_record_by_index(DB_SYS, BLOB_SYS_LOG, &current.id, record)?;
        }
        let next_version = self.get_logs(Vec::new())?.last().map(|log| log.version).unwrap_or(0) + 1;
        let log = Log {
            id: String::new(),
            version: next_version,
            is_current: true,
            query: query.clone(),
        };
        self.operation.add_records(DB_SYS, BLOB_SYS_LOG, vec![log.to_storage_record()?])?;
        Ok(())
    }

    pub fn get_logs(&self, filter_items: Vec<FilterItem>) -> Result<Vec<Log>> {
        let records = self.operation.get_records(DB_SYS, BLOB_SYS_LOG, None, filter_items)?;
        let mut logs = records.iter().map(Log::from_page_record).collect::<Result<Vec<_>>>()?;
        logs.sort_by_key(|log| log.version);
        Ok(logs)
    }

    /// Returns the single log entry marked current. More than one current
    /// entry means a prior `add_log` was interrupted mid-transition.
    pub fn get_current(&self) -> Result<Log> {
        self.try_get_current()?
            .ok_or_else(|| DbError::Corruption("no current log entry exists".to_string()))
    }

    fn try_get_current(&self) -> Result<Option<Log>> {
        let records = self.operation.get_records(
            DB_SYS,
            BLOB_SYS_LOG,
            None,
            vec![FilterItem {
                key: "is_current".to_string(),
                op: "=".to_string(),
                value: Value::Bool(true),
            }],
        )?;
        let mut current = records.iter().map(Log::from_page_record).collect::<Result<Vec<_>>>()?;
        if current.len() > 1 {
            return Err(DbError::Corruption("more than one current log entry exists".to_string()));
        }
        Ok(current.pop())
    }
}
