//! Transactional driver core for a mutation-based remote database
//!
//! The backend exposes only "execute a read query" and "commit a batch of
//! structured mutations" over stateless calls, scoped by explicit session and
//! transaction tokens. The [`Coordinator`] gives that a relational-style
//! face: statements routed by classification, emulated autocommit, write
//! mutations deferred to commit, schema changes batched into one polled
//! operation, and generated primary keys backfilled into inserts.

mod config;
mod coordinator;
mod cursor;
mod error;
mod pk;
mod result;
mod session;

pub use config::Config;
pub use coordinator::Coordinator;
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use pk::{IdGenerator, RandomIdGenerator};
pub use result::{ColumnDescription, StatementResult};

pub use spandb_sql::{Mutation, Value};
