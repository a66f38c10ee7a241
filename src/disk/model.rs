// On-disk JSON shapes. These are the exact structures serialized to
// `format.json`, `pages.json`, `indexes.json`, `partitions.json`, and
// their per-file siblings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single stored record: field name -> coerced JSON value. Never
/// carries `_id` on disk; callers attach that synthetically on the way
/// out (see `blob::Blob::build_page_records`).
pub type PageRecord = serde_json::Map<String, Value>;

/// `pages/<uuid>.json` contents: record-id -> record.
pub type PageRecords = HashMap<String, PageRecord>;

/// `indexes/<uuid>.json` contents: record-id -> owning page file name.
pub type IndexRecords = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    String,
    Int,
    Bool,
    Date,
    Datetime,
    Float,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::String => "string",
            KeyType::Int => "int",
            KeyType::Bool => "bool",
            KeyType::Date => "date",
            KeyType::Datetime => "datetime",
            KeyType::Float => "float",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatItem {
    #[serde(rename = "keyType")]
    pub key_type: KeyType,
}

/// `format.json` contents: field name -> `{keyType}`.
pub type Format = HashMap<String, FormatItem>;

/// `partitions.json` contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Partition {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageItem {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// `pages.json` contents.
pub type Pages = Vec<PageItem>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexItem {
    #[serde(rename = "fileNames")]
    pub file_names: Vec<String>,
}

/// `indexes.json` contents: one-character prefix -> file names.
pub type Indexes = HashMap<String, IndexItem>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionPageItem {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// `partitions/<hash>.json` contents.
pub type PartitionPages = Vec<PartitionPageItem>;
