//! Loose JSON-value coercion used by record formatting and filtering, so a
//! field typed `int` still accepts `"3"` or `3.0` off the wire.

use serde_json::Value;

use crate::error::{DbError, Result};

pub fn to_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| DbError::Validation(format!("cannot convert {value} to int"))),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| DbError::Validation(format!("cannot convert {value} to int"))),
        _ => Err(DbError::Validation(format!("cannot convert {value} to int"))),
    }
}

pub fn to_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DbError::Validation(format!("cannot convert {value} to float"))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| DbError::Validation(format!("cannot convert {value} to float"))),
        _ => Err(DbError::Validation(format!("cannot convert {value} to float"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_i64_accepts_number_and_string() {
        assert_eq!(to_i64(&json!(3)).unwrap(), 3);
        assert_eq!(to_i64(&json!("42")).unwrap(), 42);
        assert_eq!(to_i64(&json!(3.9)).unwrap(), 3);
    }

    #[test]
    fn to_f64_accepts_number_and_string() {
        assert_eq!(to_f64(&json!(3)).unwrap(), 3.0);
        assert_eq!(to_f64(&json!("4.5")).unwrap(), 4.5);
    }

    #[test]
    fn to_i64_rejects_bool() {
        assert!(to_i64(&json!(true)).is_err());
    }
}
