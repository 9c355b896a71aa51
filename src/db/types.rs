//! MySQL row decoding.
//!
//! Rows are turned into JSON maps so every table can be read without a
//! per-table struct. Column types are classified by name first, then decoded
//! with the matching Rust type:
//!
//! | MySQL type                         | JSON value            |
//! |------------------------------------|-----------------------|
//! | integer types (signed / UNSIGNED)  | number                |
//! | FLOAT, DOUBLE                      | number                |
//! | DECIMAL                            | string (exact digits) |
//! | BOOLEAN (`TINYINT(1)`)             | bool                  |
//! | DATE, TIME, DATETIME, TIMESTAMP    | string                |
//! | BLOB, BINARY, VARBINARY            | base64 string         |
//! | JSON                               | embedded JSON         |
//! | everything else                    | string                |

use crate::models::Row;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo, ValueRef};

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    SignedInteger,
    UnsignedInteger,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    Binary,
    Json,
    Text,
}

/// Classify a MySQL type name (as reported by sqlx) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_ascii_uppercase();

    if upper == "BOOLEAN" || upper == "BOOL" {
        return TypeCategory::Boolean;
    }
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        return TypeCategory::Decimal;
    }
    if upper.contains("INT") {
        return if upper.contains("UNSIGNED") {
            TypeCategory::UnsignedInteger
        } else {
            TypeCategory::SignedInteger
        };
    }
    if upper.contains("FLOAT") || upper.contains("DOUBLE") || upper == "REAL" {
        return TypeCategory::Float;
    }
    match upper.as_str() {
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "DATETIME" => TypeCategory::DateTime,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "JSON" => TypeCategory::Json,
        _ if upper.contains("BLOB") || upper.contains("BINARY") => TypeCategory::Binary,
        _ => TypeCategory::Text,
    }
}

/// DECIMAL values kept as their exact textual representation.
#[derive(Debug)]
struct RawDecimal(String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_ascii_uppercase();
        name.contains("DECIMAL") || name.contains("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Convert a MySQL row into a column-ordered JSON map.
pub fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name());
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(e) => {
            tracing::error!(column = idx, error = %e, "Failed to read column");
            return JsonValue::Null;
        }
    }

    let decoded = match category {
        TypeCategory::SignedInteger => row.try_get::<i64, _>(idx).map(JsonValue::from),
        TypeCategory::UnsignedInteger => row.try_get::<u64, _>(idx).map(JsonValue::from),
        TypeCategory::Float => row.try_get::<f64, _>(idx).map(float_value),
        TypeCategory::Decimal => row
            .try_get::<RawDecimal, _>(idx)
            .map(|d| JsonValue::String(d.0)),
        TypeCategory::Boolean => row.try_get::<bool, _>(idx).map(JsonValue::Bool),
        TypeCategory::Date => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| JsonValue::String(v.to_string())),
        TypeCategory::Time => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(|v| JsonValue::String(v.to_string())),
        TypeCategory::DateTime => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| JsonValue::String(v.to_string())),
        TypeCategory::Timestamp => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| JsonValue::String(v.to_rfc3339())),
        TypeCategory::Binary => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|bytes| encode_binary(&bytes)),
        TypeCategory::Json => row.try_get::<JsonValue, _>(idx),
        TypeCategory::Text => row.try_get::<String, _>(idx).map(JsonValue::String),
    };

    // Text protocol results (no bound parameters) may still decode as strings.
    decoded
        .or_else(|_| row.try_get::<String, _>(idx).map(JsonValue::String))
        .unwrap_or_else(|e| {
            tracing::error!(column = idx, ?category, error = %e, "Failed to decode column");
            JsonValue::Null
        })
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Binary columns are always base64 so the JSON stays valid.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    JsonValue::String(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integers() {
        assert_eq!(categorize_type("INT"), TypeCategory::SignedInteger);
        assert_eq!(categorize_type("BIGINT"), TypeCategory::SignedInteger);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::SignedInteger);
        assert_eq!(
            categorize_type("BIGINT UNSIGNED"),
            TypeCategory::UnsignedInteger
        );
        assert_eq!(categorize_type("int unsigned"), TypeCategory::UnsignedInteger);
    }

    #[test]
    fn test_categorize_boolean_before_integer() {
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
    }

    #[test]
    fn test_categorize_decimal_and_float() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("FLOAT"), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_temporal() {
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
    }

    #[test]
    fn test_categorize_binary_json_text() {
        assert_eq!(categorize_type("BLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("TEXT"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
    }

    #[test]
    fn test_encode_binary() {
        assert_eq!(
            encode_binary(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(encode_binary(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }
}
