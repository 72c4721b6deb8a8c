#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use spandb_coordinator::{Config, Coordinator, IdGenerator, Value};
use spandb_transport::MockTransport;

/// Deterministic id source: 1, 2, 3, …
pub struct SequenceGenerator(pub i64);

impl IdGenerator for SequenceGenerator {
    fn next_id(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

pub fn test_config() -> Config {
    Config {
        autocommit: false,
        ddl_poll_interval: Duration::from_millis(1),
        ddl_deadline: Duration::from_secs(1),
    }
}

pub async fn connect(transport: &Arc<MockTransport>) -> Coordinator<MockTransport> {
    Coordinator::connect(Arc::clone(transport), test_config())
        .await
        .expect("connect")
}

pub fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}
