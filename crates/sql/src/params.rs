//! Positional parameter formatting
//!
//! The backend accepts only named parameters (`@a`) plus a type side table,
//! while the cursor surface takes `?`-style positional values. Each `?` is
//! replaced left to right with a generated letter name and the value map is
//! keyed accordingly.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Convert a `?`-parameterized statement and positional values into the named
/// form the backend understands.
pub fn format_positional(sql: &str, values: Vec<Value>) -> Result<(String, HashMap<String, Value>)> {
    if values.len() > 26 {
        return Err(Error::ParseError(format!(
            "too many positional parameters: {} (max 26)",
            values.len()
        )));
    }

    let mut sql = sql.to_string();
    let mut params = HashMap::new();
    for (i, value) in values.into_iter().enumerate() {
        let name = ((b'a' + i as u8) as char).to_string();
        sql = sql.replacen('?', &format!("@{name}"), 1);
        params.insert(name, value);
    }
    Ok((sql, params))
}
