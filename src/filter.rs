//! Record predicates evaluated during full scans, partition scans, and
//! scoped updates/deletes. A filter is built from raw JSON and converted
//! once up front so every page search compares already-typed values.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::convert;
use crate::disk::model::{Format, KeyType, PageRecord};
use crate::error::{DbError, Result};

pub type SearchPartition = HashMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterItem {
    pub key: String,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub filter_items: Vec<FilterItem>,
    pub format: Format,
}

impl Filter {
    pub fn new(filter_items: Vec<FilterItem>, format: Format) -> Self {
        Self { filter_items, format }
    }

    /// Coerces each filter value to the type its key's format declares.
    /// Must run once before any call to `passes`.
    pub fn convert_filter_items(&mut self) -> Result<()> {
        for item in &mut self.filter_items {
            let key_type = self
                .format
                .get(&item.key)
                .map(|f| f.key_type)
                .ok_or_else(|| DbError::Validation(format!("'{}' not found in format", item.key)))?;
            item.value = match key_type {
                KeyType::String | KeyType::Date => Value::String(
                    item.value
                        .as_str()
                        .ok_or_else(|| DbError::Validation(format!("{} could not be converted to string", item.value)))?
                        .to_string(),
                ),
                KeyType::Int => Value::from(convert::to_i64(&item.value)?),
                KeyType::Float => Value::from(convert::to_f64(&item.value)?),
                KeyType::Datetime => Value::from(convert::to_i64(&item.value)?),
                KeyType::Bool => Value::Bool(
                    item.value
                        .as_bool()
                        .ok_or_else(|| DbError::Validation(format!("{} could not be converted to bool", item.value)))?,
                ),
            };
        }
        Ok(())
    }

    pub fn passes(&self, record: &PageRecord) -> Result<bool> {
        if self.filter_items.is_empty() {
            return Ok(true);
        }
        for item in &self.filter_items {
            let value = record
                .get(&item.key)
                .ok_or_else(|| DbError::Validation(format!("'{}' not found in record", item.key)))?;
            let key_type = self
                .format
                .get(&item.key)
                .map(|f| f.key_type)
                .ok_or_else(|| DbError::Validation(format!("'{}' not found in format", item.key)))?;

            let result = match key_type {
                KeyType::String => {
                    let value = value
                        .as_str()
                        .ok_or_else(|| DbError::Corruption(format!("record is corrupt value {value}")))?;
                    let compare = item.value.as_str().unwrap_or_default();
                    check_string(compare, value, &item.op)
                }
                KeyType::Int => {
                    let value = convert::to_i64(value)
                        .map_err(|e| DbError::Corruption(format!("corrupt record with value {value}: {e}")))?;
                    let compare = item.value.as_i64().unwrap_or_default();
                    check_int(compare, value, &item.op)
                }
                KeyType::Float => {
                    let value = convert::to_f64(value)
                        .map_err(|e| DbError::Corruption(format!("corrupt record with value {value}: {e}")))?;
                    let compare = item.value.as_f64().unwrap_or_default();
                    check_float(compare, value, &item.op)
                }
                KeyType::Date => {
                    let value = value
                        .as_str()
                        .ok_or_else(|| DbError::Corruption(format!("record is corrupt value {value}")))?;
                    let compare = item.value.as_str().unwrap_or_default();
                    check_date(compare, value, &item.op)
                }
                KeyType::Datetime => {
                    let value = value
                        .as_str()
                        .ok_or_else(|| DbError::Corruption(format!("record is corrupt value {value}")))?;
                    let compare = item.value.as_i64().unwrap_or_default();
                    check_datetime(compare, value, &item.op)
                }
                KeyType::Bool => {
                    let value = value
                        .as_bool()
                        .ok_or_else(|| DbError::Corruption(format!("record is corrupt value {value}")))?;
                    let compare = item.value.as_bool().unwrap_or_default();
                    check_bool(compare, value, &item.op)
                }
            };

            if !result {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn check_string(compare: &str, value: &str, op: &str) -> bool {
    match op {
        "CONTAINS_CS" => value.contains(compare),
        "CONTAINS" => value.to_lowercase().contains(&compare.to_lowercase()),
        "PREFIX_CS" => value.starts_with(compare),
        "PREFIX" => value.to_lowercase().starts_with(&compare.to_lowercase()),
        "SUFFIX_CS" => value.ends_with(compare),
        "SUFFIX" => value.to_lowercase().ends_with(&compare.to_lowercase()),
        "=" => value == compare,
        _ => false,
    }
}

fn check_int(compare: i64, value: i64, op: &str) -> bool {
    match op {
        "=" => compare == value,
        ">" => value > compare,
        ">=" => value >= compare,
        "<" => value < compare,
        "<=" => value <= compare,
        _ => false,
    }
}

fn check_float(compare: f64, value: f64, op: &str) -> bool {
    match op {
        "=" => compare == value,
        ">" => value > compare,
        ">=" => value >= compare,
        "<" => value < compare,
        "<=" => value <= compare,
        _ => false,
    }
}

fn check_date(compare: &str, value: &str, op: &str) -> bool {
    let Ok(filter_date) = chrono::NaiveDate::parse_from_str(compare, crate::constants::DATE_FORMAT) else {
        return false;
    };
    let Ok(value_date) = chrono::NaiveDate::parse_from_str(value, crate::constants::DATE_FORMAT) else {
        return false;
    };
    match op {
        "=" => value_date == filter_date,
        ">" => value_date > filter_date,
        ">=" => value_date >= filter_date,
        "<" => value_date < filter_date,
        "<=" => value_date <= filter_date,
        _ => false,
    }
}

fn check_datetime(compare: i64, value: &str, op: &str) -> bool {
    let Some(filter_dt) = chrono::DateTime::from_timestamp(compare, 0) else {
        return false;
    };
    let filter_dt = filter_dt.naive_utc();
    let Ok(value_dt) = NaiveDateTime::parse_from_str(value, crate::constants::DATETIME_FORMAT) else {
        return false;
    };
    match op {
        "=" => value_dt == filter_dt,
        ">" => value_dt > filter_dt,
        ">=" => value_dt >= filter_dt,
        "<" => value_dt < filter_dt,
        "<=" => value_dt <= filter_dt,
        _ => false,
    }
}

fn check_bool(compare: bool, value: bool, op: &str) -> bool {
    match op {
        "=" => compare == value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::model::FormatItem;
    use serde_json::json;

    fn format_with(key: &str, key_type: KeyType) -> Format {
        let mut format = Format::new();
        format.insert(key.to_string(), FormatItem { key_type });
        format
    }

    #[test]
    fn string_filter_passes_and_fails() {
        let mut filter = Filter::new(
            vec![FilterItem {
                key: "name".into(),
                op: "PREFIX".into(),
                value: json!("al"),
            }],
            format_with("name", KeyType::String),
        );
        filter.convert_filter_items().unwrap();

        let mut matching = PageRecord::new();
        matching.insert("name".into(), json!("Alice"));
        assert!(filter.passes(&matching).unwrap());

        let mut non_matching = PageRecord::new();
        non_matching.insert("name".into(), json!("Bob"));
        assert!(!filter.passes(&non_matching).unwrap());
    }

    #[test]
    fn int_filter_greater_than() {
        let mut filter = Filter::new(
            vec![FilterItem {
                key: "age".into(),
                op: ">=".into(),
                value: json!(21),
            }],
            format_with("age", KeyType::Int),
        );
        filter.convert_filter_items().unwrap();

        let mut record = PageRecord::new();
        record.insert("age".into(), json!(21));
        assert!(filter.passes(&record).unwrap());

        record.insert("age".into(), json!(20));
        assert!(!filter.passes(&record).unwrap());
    }

    #[test]
    fn missing_key_in_record_errors() {
        let mut filter = Filter::new(
            vec![FilterItem {
                key: "age".into(),
                op: "=".into(),
                value: json!(1),
            }],
            format_with("age", KeyType::Int),
        );
        filter.convert_filter_items().unwrap();
        assert!(filter.passes(&PageRecord::new()).is_err());
    }

    #[test]
    fn empty_filter_always_passes() {
        let filter = Filter::default();
        assert!(filter.passes(&PageRecord::new()).unwrap());
    }
}
