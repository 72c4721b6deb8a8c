//! Transaction coordination over the stateless backend
//!
//! The backend has no local transaction object, no DML verbs and no
//! autocommit. This module owns the connection's session and sequences every
//! statement: reads execute immediately (beginning a transaction inline when
//! none is active), writes are parsed into mutations and deferred to commit,
//! schema changes are batched into one asynchronous operation flushed ahead
//! of the mutation commit.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use spandb_sql::{classify, parse_write, Mutation, QueryKind, Value};
use spandb_transport::{Endpoint, Method, Transport};

use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::pk::{IdGenerator, PrimaryKeyResolver};
use crate::result::StatementResult;
use crate::session;

/// Introspection query resolving every table's primary-key column.
const PK_LOOKUP_SQL: &str = "\
SELECT DISTINCT
  I.TABLE_NAME,
  IC.COLUMN_NAME
FROM
  information_schema.indexes AS I
INNER JOIN
  information_schema.index_columns AS IC
ON I.INDEX_NAME = IC.INDEX_NAME AND I.TABLE_NAME = IC.TABLE_NAME
WHERE I.INDEX_TYPE = \"PRIMARY_KEY\"
AND IC.TABLE_SCHEMA = ''";

/// Introspection query behind the custom `SHOW INDEX FROM` command.
const SHOW_INDEX_SQL: &str = "\
SELECT DISTINCT
  I.TABLE_NAME,
  I.INDEX_NAME,
  I.INDEX_TYPE,
  I.IS_UNIQUE,
  I.IS_NULL_FILTERED,
  I.INDEX_STATE
FROM
  information_schema.indexes AS I
INNER JOIN
  information_schema.index_columns AS IC
ON I.INDEX_NAME = IC.INDEX_NAME AND I.TABLE_NAME = IC.TABLE_NAME
WHERE I.TABLE_NAME = @table
AND IC.TABLE_SCHEMA = ''";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TransactionState {
    NoTransaction,
    Active { token: String },
}

impl TransactionState {
    fn token(&self) -> Option<&str> {
        match self {
            TransactionState::NoTransaction => None,
            TransactionState::Active { token } => Some(token),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionKind {
    ReadOnly,
    ReadWrite,
}

impl TransactionKind {
    fn as_str(self) -> &'static str {
        match self {
            TransactionKind::ReadOnly => "readOnly",
            TransactionKind::ReadWrite => "readWrite",
        }
    }
}

/// Session, transaction and pending-work owner for one connection.
///
/// All state transitions are synchronous with respect to the caller: methods
/// take `&mut self` and there is no interior locking. Share a coordinator
/// across tasks only behind external synchronization.
pub struct Coordinator<T: Transport> {
    transport: Arc<T>,
    session: String,
    config: Config,
    state: TransactionState,
    pending_mutations: Vec<Mutation>,
    pending_schema: Vec<String>,
    pk: PrimaryKeyResolver,
}

impl<T: Transport> Coordinator<T> {
    /// Allocate the connection's session and build a coordinator around it.
    pub async fn connect(transport: Arc<T>, config: Config) -> Result<Self> {
        let session = session::create(transport.as_ref()).await?;
        debug!(%session, "session created");
        Ok(Self {
            transport,
            session,
            config,
            state: TransactionState::NoTransaction,
            pending_mutations: Vec::new(),
            pending_schema: Vec::new(),
            pk: PrimaryKeyResolver::new(),
        })
    }

    /// A cursor borrowing this coordinator, for positional-parameter
    /// execution and row iteration.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor::new(self)
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn autocommit(&self) -> bool {
        self.config.autocommit
    }

    /// Turn autocommit emulation on or off. When on, every statement is
    /// wrapped in a one-shot transaction committed as part of `execute`.
    pub fn set_autocommit(&mut self, autocommit: bool) {
        self.config.autocommit = autocommit;
    }

    /// Replace the surrogate-key generator, e.g. with a deterministic
    /// sequence in tests.
    pub fn set_id_generator(&mut self, generator: Box<dyn IdGenerator>) {
        self.pk.set_generator(generator);
    }

    /// The id generated for the most recent backfilled insert row.
    pub fn last_insert_id(&self) -> Option<i64> {
        self.pk.last_generated_id()
    }

    /// The active transaction token, if a unit of work is open.
    pub fn transaction_token(&self) -> Option<&str> {
        self.state.token()
    }

    pub fn pending_mutation_count(&self) -> usize {
        self.pending_mutations.len()
    }

    pub fn pending_schema_count(&self) -> usize {
        self.pending_schema.len()
    }

    /// Execute one statement with named parameters.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &HashMap<String, Value>,
    ) -> Result<StatementResult> {
        let result = self.dispatch(sql, params).await?;
        if self.config.autocommit {
            self.commit().await?;
        }
        Ok(result)
    }

    async fn dispatch(
        &mut self,
        sql: &str,
        params: &HashMap<String, Value>,
    ) -> Result<StatementResult> {
        match classify(sql) {
            QueryKind::SchemaChange => Ok(self.queue_schema_change(sql)),
            QueryKind::Custom => self.run_custom(sql).await,
            QueryKind::Read => self.run_read(sql, params, None, None).await,
            QueryKind::Write => self.queue_write(sql, params).await,
        }
    }

    /// Fixed special cases for the custom commands the classifier routes
    /// here; anything else is rejected.
    async fn run_custom(&mut self, sql: &str) -> Result<StatementResult> {
        let trimmed = sql.trim();
        let upper = trimmed.to_uppercase();

        if upper.starts_with("SHOW DDL") {
            let object = trimmed["SHOW DDL".len()..].trim().to_string();
            return self.show_ddl(&object).await;
        }
        if upper.starts_with("SHOW INDEX FROM") {
            let table = trimmed["SHOW INDEX FROM".len()..].trim().to_string();
            let params = HashMap::from([("table".to_string(), Value::String(table))]);
            return self.run_read(SHOW_INDEX_SQL, &params, None, None).await;
        }
        if upper.starts_with("START TRANSACTION") {
            // Rewritten to a synthetic read whose only effect is the begin.
            let kind = if upper.contains("READONLY") {
                TransactionKind::ReadOnly
            } else {
                TransactionKind::ReadWrite
            };
            return self
                .run_read("SELECT 1", &HashMap::new(), None, Some(kind))
                .await;
        }

        Err(spandb_sql::Error::UnsupportedOperation(format!(
            "unrecognized custom statement: {trimmed}"
        ))
        .into())
    }

    /// Fetch the database DDL and return it as rows, optionally filtered to
    /// the statement defining one table or index.
    async fn show_ddl(&mut self, object: &str) -> Result<StatementResult> {
        let response = self
            .transport
            .send(Endpoint::GetDdl, None, Method::Get)
            .await?;
        let statements: Vec<&str> = response
            .get("statements")
            .and_then(|v| v.as_array())
            .map(|array| array.iter().filter_map(|s| s.as_str()).collect())
            .unwrap_or_default();

        let rows: Vec<String> = if object.is_empty() {
            vec![statements.join("; ")]
        } else {
            statements
                .iter()
                .find(|statement| ddl_object_name(statement) == Some(object))
                .map(|statement| vec![statement.to_string()])
                .unwrap_or_default()
        };

        Ok(StatementResult::new(json!({ "rows": rows })))
    }

    /// Execute a read query, beginning a transaction inline when none is
    /// active. Transient override sessions never touch transaction state.
    async fn run_read(
        &mut self,
        sql: &str,
        params: &HashMap<String, Value>,
        override_session: Option<&str>,
        forced_kind: Option<TransactionKind>,
    ) -> Result<StatementResult> {
        let session = override_session.unwrap_or(&self.session).to_string();

        let transaction = if override_session.is_some() {
            serde_json::Value::Null
        } else if let Some(token) = self.state.token() {
            json!(token)
        } else {
            // Autocommit means a one-shot transaction, so a read can stay
            // read-only; otherwise later statements in the unit of work may
            // write and the transaction must be read-write from the start.
            let kind = forced_kind.unwrap_or(if self.config.autocommit {
                TransactionKind::ReadOnly
            } else {
                TransactionKind::ReadWrite
            });
            let mut begin = serde_json::Map::new();
            begin.insert(kind.as_str().to_string(), json!({}));
            json!({ "begin": begin })
        };

        let mut body = json!({
            "session": &session,
            "transaction": transaction,
            "sql": sql,
        });
        if !params.is_empty() {
            let mut wire_params = serde_json::Map::new();
            let mut param_types = serde_json::Map::new();
            for (name, value) in params {
                wire_params.insert(name.clone(), value.to_wire());
                if let Some(code) = value.type_code() {
                    param_types.insert(name.clone(), json!({ "code": code }));
                }
            }
            body["params"] = wire_params.into();
            body["paramTypes"] = param_types.into();
        }

        debug!(%sql, "executing read");
        let response = self
            .transport
            .send(
                Endpoint::ExecuteSql { session: &session },
                Some(body),
                Method::Post,
            )
            .await?;

        if override_session.is_none() && !self.state.is_active() {
            if let Some(token) = response.pointer("/transaction/id").and_then(|v| v.as_str()) {
                self.state = TransactionState::Active {
                    token: token.to_string(),
                };
            }
        }

        Ok(StatementResult::new(response))
    }

    /// Parse a write into a mutation and queue it. The statement itself never
    /// reaches the backend; its mutation rides in the commit call.
    async fn queue_write(
        &mut self,
        sql: &str,
        params: &HashMap<String, Value>,
    ) -> Result<StatementResult> {
        if !self.state.is_active() {
            let response = self
                .transport
                .send(
                    Endpoint::BeginTransaction {
                        session: &self.session,
                    },
                    Some(json!({ "options": { "readWrite": {} } })),
                    Method::Post,
                )
                .await?;
            let token = response.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                Error::MalformedResponse("begin transaction response missing id".into())
            })?;
            self.state = TransactionState::Active {
                token: token.to_string(),
            };
        }

        let mut mutation = parse_write(sql, params)?;
        self.backfill_primary_key(&mut mutation).await?;
        debug!(table = mutation.table(), "queued mutation");
        self.pending_mutations.push(mutation);

        Ok(StatementResult::empty())
    }

    async fn backfill_primary_key(&mut self, mutation: &mut Mutation) -> Result<()> {
        if !mutation.is_insert() {
            return Ok(());
        }
        let table = mutation.table().to_string();
        if self.pk.column_for(&table).is_none() {
            self.refresh_pk_cache().await?;
        }
        let pk_column = self
            .pk
            .column_for(&table)
            .ok_or_else(|| Error::UnknownPrimaryKey(table.clone()))?
            .to_string();
        self.pk.backfill(mutation, &pk_column);
        Ok(())
    }

    /// Re-run the primary-key introspection query on a transient session and
    /// replace the whole cache with the result.
    pub async fn refresh_pk_cache(&mut self) -> Result<()> {
        let temp_session = session::create(self.transport.as_ref()).await?;
        let result = self
            .run_read(PK_LOOKUP_SQL, &HashMap::new(), Some(&temp_session), None)
            .await;
        session::destroy(self.transport.as_ref(), &temp_session).await?;
        let result = result?;

        let mut mapping = HashMap::new();
        for row in result.rows() {
            let table = row.get(0).and_then(|v| v.as_str());
            let column = row.get(1).and_then(|v| v.as_str());
            let (Some(table), Some(column)) = (table, column) else {
                return Err(Error::MalformedResponse(
                    "primary-key lookup rows must be [table, column] pairs".into(),
                ));
            };
            mapping.insert(table.to_string(), column.to_string());
        }
        debug!(tables = mapping.len(), "primary-key cache refreshed");
        self.pk.replace_cache(mapping);
        Ok(())
    }

    fn queue_schema_change(&mut self, sql: &str) -> StatementResult {
        for statement in split_statements(sql) {
            debug!(statement = %statement, "queued schema change");
            self.pending_schema.push(statement);
        }
        StatementResult::empty()
    }

    /// Commit the current unit of work: flush any batched schema changes
    /// first, then submit the transaction's mutations in one call.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.pending_schema.is_empty() {
            self.flush_schema_changes().await?;
        }

        let Some(token) = self.state.token() else {
            return Ok(());
        };
        let body = json!({
            "transactionId": token,
            "mutations": &self.pending_mutations,
        });
        debug!(
            mutations = self.pending_mutations.len(),
            "committing transaction"
        );
        self.transport
            .send(
                Endpoint::Commit {
                    session: &self.session,
                },
                Some(body),
                Method::Post,
            )
            .await?;

        self.pending_mutations.clear();
        self.state = TransactionState::NoTransaction;
        Ok(())
    }

    /// Roll back the current unit of work.
    ///
    /// No rollback call exists on this backend surface; this does nothing and
    /// pending mutations and schema statements are left in place.
    pub async fn rollback(&mut self) -> Result<()> {
        warn!("rollback is a no-op; pending local state is retained");
        Ok(())
    }

    /// Submit the pending schema statements as one batched operation and poll
    /// it to completion, bounded by the configured deadline.
    async fn flush_schema_changes(&mut self) -> Result<()> {
        // Operation ids must start with a letter.
        let operation_id = format!("x{}", Uuid::new_v4().simple());
        let body = json!({
            "statements": &self.pending_schema,
            "operationId": &operation_id,
        });
        debug!(
            statements = self.pending_schema.len(),
            %operation_id,
            "submitting schema changes"
        );
        self.transport
            .send(Endpoint::UpdateDdl, Some(body), Method::Patch)
            .await?;
        self.poll_operation(&operation_id).await?;
        self.pending_schema.clear();
        Ok(())
    }

    async fn poll_operation(&self, operation_id: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.ddl_deadline;
        loop {
            let status = self
                .transport
                .send(
                    Endpoint::GetOperation {
                        operation: operation_id,
                    },
                    None,
                    Method::Get,
                )
                .await?;
            if let Some(error) = status.get("error") {
                return Err(Error::SchemaChangeFailed(error.to_string()));
            }
            if status
                .get("done")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::SchemaChangeDeadline(self.config.ddl_deadline));
            }
            tokio::time::sleep(self.config.ddl_poll_interval).await;
        }
    }
}

/// Split schema-change text on semicolons, except inside quoted regions.
/// Quote marks are kept; empty segments are dropped.
fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut in_quotes = false;
    for c in sql.chars() {
        if matches!(c, '\'' | '"' | '`') {
            in_quotes = !in_quotes;
        }
        if c == ';' && !in_quotes {
            let statement = std::mem::take(&mut buffer);
            let statement = statement.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
        } else {
            buffer.push(c);
        }
    }
    let last = buffer.trim();
    if !last.is_empty() {
        statements.push(last.to_string());
    }
    statements
}

/// The table or index a `CREATE TABLE` / `CREATE [UNIQUE] INDEX` statement
/// defines, if it is one.
fn ddl_object_name(statement: &str) -> Option<&str> {
    let mut words = statement.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("CREATE") {
        return None;
    }
    let mut word = words.next()?;
    if word.eq_ignore_ascii_case("UNIQUE") {
        word = words.next()?;
    }
    if !word.eq_ignore_ascii_case("TABLE") && !word.eq_ignore_ascii_case("INDEX") {
        return None;
    }
    let name = words.next()?;
    // Identifiers may run straight into the column list: "users(id ...".
    name.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .next()
        .filter(|n| !n.is_empty())
}
