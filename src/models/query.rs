//! Query-related data models.
//!
//! This module defines bound parameter values and statement outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One result row: column name to decoded value, in select order.
pub type Row = serde_json::Map<String, JsonValue>;

/// A scalar value bound to a positional `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Unsigned integer value (auto-increment ids are BIGINT UNSIGNED)
    UInt(u64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for QueryParam {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for QueryParam {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u64> for QueryParam {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Summary of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationSummary {
    pub rows_affected: u64,
    /// Identifier generated by this statement; `None` when nothing was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
}

/// What a single executed statement produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Mutation(MutationSummary),
}

impl QueryOutcome {
    /// Rows of a row-returning statement; a mutation yields no rows.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Mutation(_) => Vec::new(),
        }
    }

    /// Mutation summary; a row-returning statement affects nothing.
    pub fn into_summary(self) -> MutationSummary {
        match self {
            Self::Rows(_) => MutationSummary::default(),
            Self::Mutation(summary) => summary,
        }
    }

    /// First column of the first row, if this outcome has one.
    pub fn first_value(&self) -> Option<&JsonValue> {
        match self {
            Self::Rows(rows) => rows.first().and_then(|row| row.values().next()),
            Self::Mutation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_param_conversions() {
        assert_eq!(QueryParam::from(7u64), QueryParam::UInt(7));
        assert_eq!(QueryParam::from(-3), QueryParam::Int(-3));
        assert_eq!(QueryParam::from(None::<i64>), QueryParam::Null);
        assert_eq!(
            QueryParam::from(Some("robin")),
            QueryParam::String("robin".to_string())
        );
    }

    #[test]
    fn test_query_param_untagged_serde() {
        let params: Vec<QueryParam> =
            serde_json::from_value(json!([null, true, 5, "x"])).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(5),
                QueryParam::String("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_first_value_of_rows() {
        let mut row = Row::new();
        row.insert("LAST_INSERT_ID()".to_string(), json!(12));
        let outcome = QueryOutcome::Rows(vec![row]);
        assert_eq!(outcome.first_value(), Some(&json!(12)));
    }

    #[test]
    fn test_mutation_has_no_rows() {
        let outcome = QueryOutcome::Mutation(MutationSummary {
            rows_affected: 2,
            last_insert_id: None,
        });
        assert!(outcome.first_value().is_none());
        assert_eq!(outcome.clone().into_summary().rows_affected, 2);
        assert!(outcome.into_rows().is_empty());
    }
}
