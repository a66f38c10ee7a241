//! Name and record validation for databases and blobs: snake_case naming
//! conventions, format-shape checks, and the per-type coercion a record
//! goes through on its way to and from disk.

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;

use crate::constants;
use crate::convert;
use crate::disk::model::{Format, FormatItem, KeyType, PageRecord, Partition};
use crate::error::{DbError, Result};

pub struct DbFormatter<'a> {
    pub name: &'a str,
}

impl<'a> DbFormatter<'a> {
    pub fn has_db_name_convention(&self) -> Result<()> {
        check_name_convention(self.name, constants::DB_MAX_LENGTH)
    }
}

fn check_name_convention(name: &str, max_length: usize) -> Result<()> {
    if name.len() > max_length {
        return Err(DbError::Validation(format!(
            "name length on {name} exceeds {max_length}"
        )));
    }
    let re = Regex::new(constants::NAME_REGEX).expect("static regex is valid");
    if !re.is_match(name) {
        return Err(DbError::Validation(format!(
            "name {name} does not match {}",
            constants::NAME_REGEX_DESC
        )));
    }
    Ok(())
}

pub struct BlobFormatter<'a> {
    pub name: &'a str,
    pub format: &'a Format,
    pub partition: Option<&'a Partition>,
}

impl<'a> BlobFormatter<'a> {
    pub fn new(name: &'a str, format: &'a Format) -> Self {
        Self {
            name,
            format,
            partition: None,
        }
    }

    pub fn with_partition(name: &'a str, format: &'a Format, partition: &'a Partition) -> Self {
        Self {
            name,
            format,
            partition: Some(partition),
        }
    }

    pub fn has_blob_name_convention(&self) -> Result<()> {
        check_name_convention(self.name, constants::BLOB_MAX_LENGTH)
    }

    pub fn has_format_structure(&self) -> Result<()> {
        for key in self.format.keys() {
            if key.len() > constants::KEY_MAX_LENGTH {
                return Err(DbError::Validation(format!(
                    "key length on {key} exceeds {}",
                    constants::KEY_MAX_LENGTH
                )));
            }
            let re = Regex::new(constants::NAME_REGEX).expect("static regex is valid");
            if !re.is_match(key) {
                return Err(DbError::Validation(format!(
                    "key {key} does not match {}",
                    constants::NAME_REGEX_DESC
                )));
            }
        }
        Ok(())
    }

    pub fn has_partition_structure(&self) -> Result<()> {
        let Some(partition) = self.partition else {
            return Ok(());
        };
        for key in &partition.keys {
            if !self.format.contains_key(key) {
                return Err(DbError::Validation(format!(
                    "partition key {key} not found in format"
                )));
            }
        }
        Ok(())
    }

    pub fn format_record(&self, record: &PageRecord) -> Result<PageRecord> {
        if self.format.len() != record.len() {
            return Err(DbError::Validation(
                "record does not match format length".to_string(),
            ));
        }
        let mut new_record = PageRecord::new();
        for (key, value) in record {
            let format_item = self
                .format
                .get(key)
                .ok_or_else(|| DbError::Validation(format!("key {key} does not exist in {}", self.name)))?;
            let new_value = convert_record_value(value, format_item)
                .map_err(|e| DbError::Validation(format!("error on key {key}: {e}")))?;
            new_record.insert(key.clone(), new_value);
        }
        Ok(new_record)
    }

    pub fn format_update_record(&self, record: &PageRecord) -> Result<PageRecord> {
        let mut new_record = PageRecord::new();
        for (key, value) in record {
            let format_item = self
                .format
                .get(key)
                .ok_or_else(|| DbError::Validation(format!("key {key} does not exist in {}", self.name)))?;
            if let Some(partition) = self.partition {
                if partition.keys.iter().any(|k| k == key) {
                    return Err(DbError::Validation(format!(
                        "key {key} cannot be updated because it belongs to partition"
                    )));
                }
            }
            let new_value = convert_record_value(value, format_item)
                .map_err(|e| DbError::Validation(format!("error on key {key}: {e}")))?;
            new_record.insert(key.clone(), new_value);
        }
        Ok(new_record)
    }
}

fn convert_record_value(value: &Value, format_item: &FormatItem) -> Result<Value> {
    match format_item.key_type {
        KeyType::String => value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| DbError::Validation(format!("{value} could not be converted to string"))),
        KeyType::Int => Ok(Value::from(convert::to_i64(value)?)),
        KeyType::Float => Ok(Value::from(convert::to_f64(value)?)),
        KeyType::Bool => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| DbError::Validation(format!("{value} could not convert to bool"))),
        KeyType::Date | KeyType::Datetime => {
            let seconds = convert::to_i64(value)?;
            let timestamp = DateTime::from_timestamp(seconds, 0)
                .ok_or_else(|| DbError::Validation(format!("{seconds} is not a valid unix timestamp")))?;
            let formatted = if format_item.key_type == KeyType::Date {
                timestamp.format(constants::DATE_FORMAT).to_string()
            } else {
                timestamp.format(constants::DATETIME_FORMAT).to_string()
            };
            Ok(Value::String(formatted))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn format_with(key: &str, key_type: KeyType) -> Format {
        let mut format = Format::new();
        format.insert(key.to_string(), FormatItem { key_type });
        format
    }

    #[test]
    fn db_name_convention_rejects_uppercase() {
        let formatter = DbFormatter { name: "BadName" };
        assert!(formatter.has_db_name_convention().is_err());
    }

    #[test]
    fn db_name_convention_accepts_snake_case() {
        let formatter = DbFormatter { name: "good_name" };
        assert!(formatter.has_db_name_convention().is_ok());
    }

    #[test]
    fn format_record_coerces_int_from_string() {
        let format = format_with("age", KeyType::Int);
        let formatter = BlobFormatter::new("people", &format);
        let mut record = PageRecord::new();
        record.insert("age".into(), json!("42"));
        let formatted = formatter.format_record(&record).unwrap();
        assert_eq!(formatted.get("age").unwrap(), &json!(42));
    }

    #[test]
    fn format_record_rejects_length_mismatch() {
        let format = format_with("age", KeyType::Int);
        let formatter = BlobFormatter::new("people", &format);
        let mut record = PageRecord::new();
        record.insert("age".into(), json!(1));
        record.insert("extra".into(), json!(1));
        assert!(formatter.format_record(&record).is_err());
    }

    #[test]
    fn update_record_rejects_partition_key() {
        let format = format_with("region", KeyType::String);
        let partition = Partition {
            keys: vec!["region".to_string()],
        };
        let formatter = BlobFormatter::with_partition("people", &format, &partition);
        let mut record = PageRecord::new();
        record.insert("region".into(), json!("east"));
        assert!(formatter.format_update_record(&record).is_err());
    }
}
