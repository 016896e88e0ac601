use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Serializes a value into JSON text for storage in a JSON column.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        warn!(%err, "failed to serialize JSON column, storing null");
        "null".to_string()
    })
}

/// Reads back an optional JSON column fetched as text.
pub fn from_optional_json<T: for<'de> Deserialize<'de>>(
    result: rusqlite::Result<String>,
) -> Option<T> {
    match result {
        Ok(s) if !s.is_empty() && s != "null" => serde_json::from_str(&s).ok(),
        _ => None,
    }
}

/// Converts an optional timestamp into its stored form (RFC 3339 text).
pub fn datetime_value(at: Option<DateTime<Utc>>) -> Value {
    match at {
        Some(at) => Value::Text(at.to_rfc3339()),
        None => Value::Null,
    }
}
