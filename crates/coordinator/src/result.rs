//! Statement results
//!
//! Thin wrapper over the backend's JSON response giving the cursor layer row
//! access and column descriptions without re-shaping the payload.

use serde_json::json;

/// One column of a result set, from the response metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_code: String,
}

/// The decoded response to one statement.
#[derive(Debug, Clone)]
pub struct StatementResult {
    response: serde_json::Value,
}

impl StatementResult {
    pub(crate) fn new(response: serde_json::Value) -> Self {
        Self { response }
    }

    /// Stub result for statements that produce no backend response (queued
    /// writes and schema changes), with empty metadata so the cursor still
    /// sees a description.
    pub(crate) fn empty() -> Self {
        Self::new(json!({
            "rows": [],
            "metadata": { "rowType": { "fields": [] } }
        }))
    }

    /// Result rows; empty when the response carries none.
    pub fn rows(&self) -> &[serde_json::Value] {
        self.response
            .get("rows")
            .and_then(|rows| rows.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Column descriptions from the metadata field list, or None when the
    /// response has no metadata at all.
    pub fn columns(&self) -> Option<Vec<ColumnDescription>> {
        let metadata = self.response.get("metadata")?;
        let fields = metadata
            .pointer("/rowType/fields")
            .and_then(|fields| fields.as_array())?;
        Some(
            fields
                .iter()
                .map(|field| ColumnDescription {
                    name: field
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    type_code: field
                        .pointer("/type/code")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect(),
        )
    }

    /// The raw response body.
    pub fn raw(&self) -> &serde_json::Value {
        &self.response
    }
}
