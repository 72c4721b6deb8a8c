//! Error types for the SQL front end

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed write statement: missing keyword, unbalanced bracket,
    /// malformed row, unknown parameter placeholder.
    #[error("SQL parse error: {0}")]
    ParseError(String),

    /// Statement is recognized but outside the supported dialect, e.g. a
    /// DELETE predicate that is neither `=` nor `IN`.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The parser was handed a statement whose method is not INSERT, UPDATE
    /// or DELETE.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}
