//! Ordered column/value mapping used by insert, update and upsert.

use crate::models::QueryParam;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Column names mapped to the values written into them.
///
/// Insertion order is preserved because it decides placeholder order in the
/// generated SQL. Setting a column that is already present replaces its value
/// in place, so column names stay distinct.
///
/// ```
/// use mysql_easier::models::Fields;
///
/// let fields = Fields::new().with("username", "batman").with("password", "robin");
/// assert_eq!(fields.columns().collect::<Vec<_>>(), ["username", "password"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct Fields {
    entries: Vec<(String, QueryParam)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Fields::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column's value, keeping its original position if already present.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<QueryParam>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&QueryParam> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &QueryParam> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryParam)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<QueryParam>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (column, value) in iter {
            fields.set(column, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Objects deserialize column by column; non-scalar values become strings.
impl From<serde_json::Map<String, serde_json::Value>> for Fields {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        use serde_json::Value;

        map.into_iter()
            .map(|(column, value)| {
                let param = match value {
                    Value::Null => QueryParam::Null,
                    Value::Bool(b) => QueryParam::Bool(b),
                    Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                        (Some(i), _) => QueryParam::Int(i),
                        (None, Some(u)) => QueryParam::UInt(u),
                        _ => QueryParam::Float(n.as_f64().unwrap_or_default()),
                    },
                    Value::String(s) => QueryParam::String(s),
                    other => QueryParam::String(other.to_string()),
                };
                (column, param)
            })
            .collect()
    }
}
