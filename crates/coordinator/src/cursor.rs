//! Cursor surface
//!
//! A minimal DB-API style cursor borrowing the connection's coordinator:
//! positional `?` parameters in, row iteration and column descriptions out.

use spandb_sql::{format_positional, Value};
use spandb_transport::Transport;

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::result::{ColumnDescription, StatementResult};

pub struct Cursor<'a, T: Transport> {
    coordinator: &'a mut Coordinator<T>,
    result: Option<StatementResult>,
    position: usize,
    lastrowid: Option<i64>,
}

impl<'a, T: Transport> Cursor<'a, T> {
    pub(crate) fn new(coordinator: &'a mut Coordinator<T>) -> Self {
        Self {
            coordinator,
            result: None,
            position: 0,
            lastrowid: None,
        }
    }

    /// Execute a statement with positional parameters.
    pub async fn execute(&mut self, sql: &str, values: Vec<Value>) -> Result<()> {
        let (sql, params) = format_positional(sql, values)?;
        let result = self.coordinator.execute(&sql, &params).await?;
        self.lastrowid = self.coordinator.last_insert_id();
        self.result = Some(result);
        self.position = 0;
        Ok(())
    }

    /// The next row of the last result, if any.
    pub fn fetchone(&mut self) -> Option<serde_json::Value> {
        let row = self.result.as_ref()?.rows().get(self.position).cloned()?;
        self.position += 1;
        Some(row)
    }

    /// Up to `size` further rows of the last result.
    pub fn fetchmany(&mut self, size: usize) -> Vec<serde_json::Value> {
        let mut rows = Vec::new();
        for _ in 0..size {
            match self.fetchone() {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        rows
    }

    /// All remaining rows of the last result.
    pub fn fetchall(&mut self) -> Vec<serde_json::Value> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetchone() {
            rows.push(row);
        }
        rows
    }

    /// Number of rows in the last result.
    pub fn rowcount(&self) -> usize {
        self.result.as_ref().map_or(0, StatementResult::row_count)
    }

    /// The id generated for the most recent backfilled insert.
    pub fn lastrowid(&self) -> Option<i64> {
        self.lastrowid
    }

    /// Column descriptions of the last result, None when it carried no
    /// metadata.
    pub fn description(&self) -> Option<Vec<ColumnDescription>> {
        self.result.as_ref()?.columns()
    }
}
