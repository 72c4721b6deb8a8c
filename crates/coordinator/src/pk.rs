//! Primary-key resolution and backfill
//!
//! The backend requires every insert to carry its table's primary key. When a
//! statement omits it, a surrogate id is generated and prepended to each row.
//! The table-to-column mapping comes from one introspection read, cached here
//! and fully replaced (never merged) on refresh.

use std::collections::HashMap;

use rand::Rng;
use spandb_sql::{Mutation, Value};

/// Pluggable source of generated surrogate keys, so tests can supply
/// deterministic sequences.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> i64;
}

/// Default generator: uniform random over [-(2^63), 2^63 - 2]. The upper
/// bound excludes i64::MAX, matching the reference key-generation policy.
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> i64 {
        rand::thread_rng().gen_range(i64::MIN..=i64::MAX - 1)
    }
}

pub(crate) struct PrimaryKeyResolver {
    cache: HashMap<String, String>,
    generator: Box<dyn IdGenerator>,
    last_id: Option<i64>,
}

impl PrimaryKeyResolver {
    pub(crate) fn new() -> Self {
        Self {
            cache: HashMap::new(),
            generator: Box::new(RandomIdGenerator),
            last_id: None,
        }
    }

    /// The cached primary-key column for `table`, if known.
    pub(crate) fn column_for(&self, table: &str) -> Option<&str> {
        debug_assert!(!table.is_empty());
        self.cache.get(table).map(String::as_str)
    }

    /// Replace the whole cache with a fresh introspection result.
    pub(crate) fn replace_cache(&mut self, mapping: HashMap<String, String>) {
        self.cache = mapping;
    }

    pub(crate) fn set_generator(&mut self, generator: Box<dyn IdGenerator>) {
        self.generator = generator;
    }

    /// The most recently generated id, overwritten on each backfilled row.
    pub(crate) fn last_generated_id(&self) -> Option<i64> {
        self.last_id
    }

    /// Prepend `pk_column` and a generated id to every row of an insert that
    /// does not already name the column. Non-inserts are left untouched.
    pub(crate) fn backfill(&mut self, mutation: &mut Mutation, pk_column: &str) {
        let Mutation::Insert {
            columns, values, ..
        } = mutation
        else {
            return;
        };
        if columns.iter().any(|column| column == pk_column) {
            return;
        }

        columns.insert(0, pk_column.to_string());
        for row in values.iter_mut() {
            let id = self.generator.next_id();
            row.insert(0, Value::Int(id).to_wire());
            self.last_id = Some(id);
        }
    }
}
