//! Driver-side scalar values and wire coercion
//!
//! The backend's JSON encoding is picky about scalars: 64-bit integers must
//! travel as decimal strings (a JSON number would lose precision in any
//! double-based decoder), bytes as base64 text, and timestamps in UTC with a
//! trailing "Z".

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde_json::json;

/// A parameter value supplied to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Timezone-aware timestamp; rendered in UTC on the wire.
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl Value {
    /// Encode this value as the wire scalar the backend expects.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i.to_string()),
            Value::Float(f) => json!(f),
            Value::String(s) => json!(s),
            Value::Bytes(b) => json!(BASE64.encode(b)),
            Value::Timestamp(ts) => json!(ts
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Date(d) => json!(d.to_string()),
        }
    }

    /// Parameter type code for the `paramTypes` side table, for the value
    /// kinds whose wire encoding is ambiguous without one.
    pub fn type_code(&self) -> Option<&'static str> {
        match self {
            Value::Int(_) => Some("INT64"),
            Value::String(_) => Some("STRING"),
            Value::Bytes(_) => Some("BYTES"),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
