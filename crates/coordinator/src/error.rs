//! Error types for the coordinator

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Tokenizer/parser/classifier errors from the SQL front end.
    #[error(transparent)]
    Sql(#[from] spandb_sql::Error),

    /// A backend round trip failed; pending mutations and schema statements
    /// are left untouched.
    #[error(transparent)]
    Transport(#[from] spandb_transport::TransportError),

    /// A schema-change operation reported a terminal error.
    #[error("schema change failed: {0}")]
    SchemaChangeFailed(String),

    /// A schema-change operation did not complete within the deadline.
    #[error("schema change did not complete within {0:?}")]
    SchemaChangeDeadline(std::time::Duration),

    /// The backend response was missing an expected field.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// No primary-key column is known for a table, even after refreshing the
    /// introspection cache.
    #[error("no primary key known for table {0}")]
    UnknownPrimaryKey(String),
}
