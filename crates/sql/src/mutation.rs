//! Mutation descriptors
//!
//! The backend has no INSERT/UPDATE/DELETE verbs; writes travel as structured
//! mutations inside the commit call. Serialization produces the wire shape
//! directly: `{"insert": {"table": …, "columns": […], "values": [[…]]}}`,
//! `{"delete": {"table": …, "keySet": […]}}`.

use serde::Serialize;

/// A parsed write statement, ready for transactional submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Mutation {
    #[serde(rename = "insert")]
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Vec<serde_json::Value>>,
    },
    #[serde(rename = "update")]
    Update {
        table: String,
        columns: Vec<String>,
        values: Vec<Vec<serde_json::Value>>,
    },
    #[serde(rename = "delete")]
    Delete {
        table: String,
        #[serde(rename = "keySet")]
        key_set: Vec<serde_json::Value>,
    },
}

impl Mutation {
    /// The table this mutation targets.
    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert { table, .. }
            | Mutation::Update { table, .. }
            | Mutation::Delete { table, .. } => table,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Mutation::Insert { .. })
    }
}
