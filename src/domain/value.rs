//! Column values and declared column types
//!
//! Rows are modelled as a tagged union of column values keyed by a statically
//! known table descriptor, so masking dispatches on the declared type instead
//! of inspecting loosely typed JSON at runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Free text
    Text,
    /// UUID identifier
    Uuid,
    /// 64-bit signed integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean flag
    Boolean,
    /// UTC timestamp
    Timestamp,
}

impl Default for ColumnType {
    fn default() -> Self {
        Self::Text
    }
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl ColumnValue {
    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Declared type that naturally holds this value (None for `Null`)
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Null => None,
            ColumnValue::Bool(_) => Some(ColumnType::Boolean),
            ColumnValue::Integer(_) => Some(ColumnType::Integer),
            ColumnValue::Float(_) => Some(ColumnType::Float),
            ColumnValue::Text(_) => Some(ColumnType::Text),
            ColumnValue::Uuid(_) => Some(ColumnType::Uuid),
            ColumnValue::Timestamp(_) => Some(ColumnType::Timestamp),
        }
    }

    /// Canonical textual form used as a mapping and lookup key
    ///
    /// The key is type-agnostic so an integer key `7` referenced from a text
    /// column holding `"7"` resolves to the same entry. Hyphenated UUID text is
    /// lowercased to match the form of `Uuid` values.
    pub fn canonical_key(&self) -> Option<String> {
        match self {
            ColumnValue::Null => None,
            ColumnValue::Bool(b) => Some(b.to_string()),
            ColumnValue::Integer(i) => Some(i.to_string()),
            ColumnValue::Float(f) => Some(f.to_string()),
            ColumnValue::Text(s) if s.len() == 36 && Uuid::try_parse(s).is_ok() => {
                Some(s.to_ascii_lowercase())
            }
            ColumnValue::Text(s) => Some(s.clone()),
            ColumnValue::Uuid(u) => Some(u.hyphenated().to_string()),
            ColumnValue::Timestamp(ts) => Some(ts.to_rfc3339()),
        }
    }

    /// Builds a value from JSON according to the declared column type
    pub fn from_json(value: &JsonValue, column_type: ColumnType) -> Result<Self, String> {
        if value.is_null() {
            return Ok(ColumnValue::Null);
        }

        match column_type {
            ColumnType::Text => Ok(ColumnValue::Text(match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })),
            ColumnType::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(ColumnValue::Uuid)
                .ok_or_else(|| format!("expected UUID, got {value}")),
            ColumnType::Integer => match value {
                JsonValue::Number(n) => n
                    .as_i64()
                    .map(ColumnValue::Integer)
                    .ok_or_else(|| format!("expected integer, got {n}")),
                JsonValue::String(s) => s
                    .parse()
                    .map(ColumnValue::Integer)
                    .map_err(|e| format!("expected integer, got '{s}': {e}")),
                other => Err(format!("expected integer, got {other}")),
            },
            ColumnType::Float => match value {
                JsonValue::Number(n) => n
                    .as_f64()
                    .map(ColumnValue::Float)
                    .ok_or_else(|| format!("expected number, got {n}")),
                JsonValue::String(s) => s
                    .parse()
                    .map(ColumnValue::Float)
                    .map_err(|e| format!("expected number, got '{s}': {e}")),
                other => Err(format!("expected number, got {other}")),
            },
            ColumnType::Boolean => match value {
                JsonValue::Bool(b) => Ok(ColumnValue::Bool(*b)),
                JsonValue::String(s) => s
                    .parse()
                    .map(ColumnValue::Bool)
                    .map_err(|e| format!("expected boolean, got '{s}': {e}")),
                other => Err(format!("expected boolean, got {other}")),
            },
            ColumnType::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| ColumnValue::Timestamp(ts.with_timezone(&Utc)))
                .ok_or_else(|| format!("expected RFC 3339 timestamp, got {value}")),
        }
    }

    /// Converts the value back into JSON
    pub fn to_json(&self) -> JsonValue {
        match self {
            ColumnValue::Null => JsonValue::Null,
            ColumnValue::Bool(b) => JsonValue::Bool(*b),
            ColumnValue::Integer(i) => JsonValue::from(*i),
            ColumnValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ColumnValue::Text(s) => JsonValue::String(s.clone()),
            ColumnValue::Uuid(u) => JsonValue::String(u.hyphenated().to_string()),
            ColumnValue::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
        }
    }

    /// Converts the value to the declared column type where a lossless
    /// conversion exists, otherwise returns it unchanged
    pub fn conform_to(self, column_type: ColumnType) -> Self {
        match (self, column_type) {
            (ColumnValue::Uuid(u), ColumnType::Text) => {
                ColumnValue::Text(u.hyphenated().to_string())
            }
            (ColumnValue::Integer(i), ColumnType::Text) => ColumnValue::Text(i.to_string()),
            (ColumnValue::Text(s), ColumnType::Uuid) => match Uuid::parse_str(&s) {
                Ok(u) => ColumnValue::Uuid(u),
                Err(_) => ColumnValue::Text(s),
            },
            (ColumnValue::Text(s), ColumnType::Integer) => match s.parse() {
                Ok(i) => ColumnValue::Integer(i),
                Err(_) => ColumnValue::Text(s),
            },
            (ColumnValue::Integer(i), ColumnType::Float) => ColumnValue::Float(i as f64),
            (value, _) => value,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_key() {
            Some(key) => write!(f, "{key}"),
            None => write!(f, "NULL"),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Float(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

impl From<Uuid> for ColumnValue {
    fn from(value: Uuid) -> Self {
        ColumnValue::Uuid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_by_declared_type() {
        assert_eq!(
            ColumnValue::from_json(&json!("42"), ColumnType::Integer).unwrap(),
            ColumnValue::Integer(42)
        );
        assert_eq!(
            ColumnValue::from_json(&json!(42), ColumnType::Text).unwrap(),
            ColumnValue::Text("42".to_string())
        );
        assert_eq!(
            ColumnValue::from_json(&json!(null), ColumnType::Uuid).unwrap(),
            ColumnValue::Null
        );
        assert!(ColumnValue::from_json(&json!("not-a-uuid"), ColumnType::Uuid).is_err());
    }

    #[test]
    fn test_timestamp_from_json() {
        let value =
            ColumnValue::from_json(&json!("2024-01-15T10:30:00Z"), ColumnType::Timestamp).unwrap();
        assert!(matches!(value, ColumnValue::Timestamp(_)));
        assert_eq!(value.to_json(), json!("2024-01-15T10:30:00+00:00"));
    }

    #[test]
    fn test_canonical_key_is_type_agnostic() {
        assert_eq!(
            ColumnValue::Integer(7).canonical_key(),
            ColumnValue::Text("7".to_string()).canonical_key()
        );
        assert_eq!(ColumnValue::Null.canonical_key(), None);
    }

    #[test]
    fn test_uuid_text_key_is_lowercase() {
        let raw = "7D44B88C-4199-4BAD-97DC-D78268E01398";
        let id = Uuid::parse_str(raw).unwrap();
        assert_eq!(
            ColumnValue::from(raw).canonical_key(),
            ColumnValue::Uuid(id).canonical_key()
        );
        assert_eq!(ColumnValue::from("ABC").canonical_key().as_deref(), Some("ABC"));
    }

    #[test]
    fn test_conform_to() {
        let id = Uuid::parse_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
        assert_eq!(
            ColumnValue::Uuid(id).conform_to(ColumnType::Text),
            ColumnValue::Text("7d44b88c-4199-4bad-97dc-d78268e01398".to_string())
        );
        assert_eq!(
            ColumnValue::Text("abc".to_string()).conform_to(ColumnType::Uuid),
            ColumnValue::Text("abc".to_string())
        );
    }

    #[test]
    fn test_serde_tagged_representation() {
        let json = serde_json::to_value(ColumnValue::Integer(5)).unwrap();
        assert_eq!(json, json!({"type": "integer", "value": 5}));
        let back: ColumnValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, ColumnValue::Integer(5));
    }
}
