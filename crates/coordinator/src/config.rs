//! Driver configuration

use std::time::Duration;

/// Tunables for a [`crate::Coordinator`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Commit after every statement, wrapping each in a one-shot transaction.
    /// The backend has no native autocommit mode.
    pub autocommit: bool,

    /// Interval between schema-change operation polls.
    pub ddl_poll_interval: Duration,

    /// Overall deadline for a schema-change operation to report done.
    pub ddl_deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autocommit: false,
            ddl_poll_interval: Duration::from_millis(100),
            ddl_deadline: Duration::from_secs(300),
        }
    }
}
