//! Transaction sequencing: inline begins, deferred writes, autocommit
//! emulation and commit behavior against a scripted transport.

mod common;

use std::sync::Arc;

use serde_json::json;
use spandb_coordinator::{Error, Value};
use spandb_transport::{EndpointKind, MockTransport};

use common::{connect, params, SequenceGenerator};

/// Scripts the primary-key introspection read so the first lookup resolves
/// `test` to `id`.
fn script_pk_lookup(transport: &MockTransport) {
    transport.script(
        EndpointKind::ExecuteSql,
        json!({ "rows": [["test", "id"]] }),
    );
}

#[tokio::test]
async fn test_read_without_autocommit_begins_read_write() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator
        .execute("SELECT * FROM users", &params(&[]))
        .await
        .unwrap();

    let executes = transport.calls_to(EndpointKind::ExecuteSql);
    assert_eq!(executes.len(), 1);
    let body = executes[0].body.as_ref().unwrap();
    assert_eq!(body["transaction"], json!({ "begin": { "readWrite": {} } }));
    assert_eq!(body["session"], json!("session-1"));

    // The token from the response stays active; nothing was committed.
    assert_eq!(coordinator.transaction_token(), Some("txn-1"));
    assert!(transport.calls_to(EndpointKind::Commit).is_empty());
}

#[tokio::test]
async fn test_autocommit_read_is_one_shot_read_only() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    coordinator.set_autocommit(true);

    coordinator
        .execute("SELECT * FROM users", &params(&[]))
        .await
        .unwrap();

    let executes = transport.calls_to(EndpointKind::ExecuteSql);
    let body = executes[0].body.as_ref().unwrap();
    assert_eq!(body["transaction"], json!({ "begin": { "readOnly": {} } }));

    // Exactly one commit, and no transaction id survives the statement.
    assert_eq!(transport.calls_to(EndpointKind::Commit).len(), 1);
    assert_eq!(coordinator.transaction_token(), None);
}

#[tokio::test]
async fn test_second_read_reuses_active_token() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator.execute("SELECT 1", &params(&[])).await.unwrap();
    coordinator.execute("SELECT 2", &params(&[])).await.unwrap();

    let executes = transport.calls_to(EndpointKind::ExecuteSql);
    assert_eq!(executes.len(), 2);
    assert_eq!(
        executes[1].body.as_ref().unwrap()["transaction"],
        json!("txn-1")
    );
}

#[tokio::test]
async fn test_write_is_deferred_to_commit() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    script_pk_lookup(&transport);

    coordinator
        .execute(
            "INSERT INTO test (id, field) VALUES (@a, @b)",
            &params(&[("a", Value::Int(7)), ("b", "x".into())]),
        )
        .await
        .unwrap();

    // The write begins a transaction explicitly and executes nothing. The
    // only ExecuteSql so far is the introspection read on its own session.
    assert_eq!(transport.calls_to(EndpointKind::BeginTransaction).len(), 1);
    let executes = transport.calls_to(EndpointKind::ExecuteSql);
    assert_eq!(executes.len(), 1);
    assert_eq!(
        executes[0].body.as_ref().unwrap()["transaction"],
        serde_json::Value::Null
    );
    assert_eq!(coordinator.pending_mutation_count(), 1);

    coordinator.commit().await.unwrap();

    let commits = transport.calls_to(EndpointKind::Commit);
    assert_eq!(commits.len(), 1);
    let body = commits[0].body.as_ref().unwrap();
    assert_eq!(body["transactionId"], json!("txn-1"));
    assert_eq!(
        body["mutations"],
        json!([{ "insert": {
            "table": "test",
            "columns": ["id", "field"],
            "values": [["7", "x"]]
        } }])
    );

    assert_eq!(coordinator.pending_mutation_count(), 0);
    assert_eq!(coordinator.transaction_token(), None);
}

#[tokio::test]
async fn test_writes_share_one_transaction() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    script_pk_lookup(&transport);

    coordinator
        .execute(
            "INSERT INTO test (id, field) VALUES (@a, @b)",
            &params(&[("a", Value::Int(1)), ("b", "x".into())]),
        )
        .await
        .unwrap();
    coordinator
        .execute(
            "UPDATE test SET field = @a",
            &params(&[("a", "y".into())]),
        )
        .await
        .unwrap();

    assert_eq!(transport.calls_to(EndpointKind::BeginTransaction).len(), 1);
    assert_eq!(coordinator.pending_mutation_count(), 2);
}

#[tokio::test]
async fn test_update_and_delete_mutation_payloads() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator
        .execute(
            "UPDATE test SET field1 = @a, field2 = @b",
            &params(&[("a", Value::Int(1)), ("b", Value::Int(2))]),
        )
        .await
        .unwrap();
    coordinator
        .execute(
            "DELETE FROM test WHERE field1 IN (@a, @b)",
            &params(&[("a", Value::Int(1)), ("b", Value::Int(2))]),
        )
        .await
        .unwrap();
    coordinator.commit().await.unwrap();

    let commits = transport.calls_to(EndpointKind::Commit);
    assert_eq!(
        commits[0].body.as_ref().unwrap()["mutations"],
        json!([
            { "update": {
                "table": "test",
                "columns": ["field1", "field2"],
                "values": [["1", "2"]]
            } },
            { "delete": { "table": "test", "keySet": ["1", "2"] } }
        ])
    );
}

#[tokio::test]
async fn test_autocommit_write_commits_immediately() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    coordinator.set_autocommit(true);
    script_pk_lookup(&transport);

    coordinator
        .execute(
            "INSERT INTO test (id, field) VALUES (@a, @b)",
            &params(&[("a", Value::Int(1)), ("b", "x".into())]),
        )
        .await
        .unwrap();

    assert_eq!(transport.calls_to(EndpointKind::Commit).len(), 1);
    assert_eq!(coordinator.pending_mutation_count(), 0);
    assert_eq!(coordinator.transaction_token(), None);
}

#[tokio::test]
async fn test_pk_backfill_prepends_generated_id() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    coordinator.set_id_generator(Box::new(SequenceGenerator(41)));
    script_pk_lookup(&transport);

    coordinator
        .execute(
            "INSERT INTO test (field) VALUES (@a)",
            &params(&[("a", Value::Int(1))]),
        )
        .await
        .unwrap();
    coordinator.commit().await.unwrap();

    let commits = transport.calls_to(EndpointKind::Commit);
    assert_eq!(
        commits[0].body.as_ref().unwrap()["mutations"],
        json!([{ "insert": {
            "table": "test",
            "columns": ["id", "field"],
            "values": [["42", "1"]]
        } }])
    );
    assert_eq!(coordinator.last_insert_id(), Some(42));
}

#[tokio::test]
async fn test_pk_backfill_skips_present_column() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    coordinator.set_id_generator(Box::new(SequenceGenerator(0)));
    script_pk_lookup(&transport);

    coordinator
        .execute(
            "INSERT INTO test (id, field) VALUES (@a, @b)",
            &params(&[("a", Value::Int(9)), ("b", "x".into())]),
        )
        .await
        .unwrap();
    coordinator.commit().await.unwrap();

    let commits = transport.calls_to(EndpointKind::Commit);
    let mutation = &commits[0].body.as_ref().unwrap()["mutations"][0]["insert"];
    // No duplicate id column, no generated id.
    assert_eq!(mutation["columns"], json!(["id", "field"]));
    assert_eq!(coordinator.last_insert_id(), None);
}

#[tokio::test]
async fn test_pk_lookup_uses_transient_session() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    script_pk_lookup(&transport);

    coordinator
        .execute(
            "INSERT INTO test (field) VALUES (@a)",
            &params(&[("a", Value::Int(1))]),
        )
        .await
        .unwrap();

    // One session for the connection, one transient session for the lookup.
    assert_eq!(transport.calls_to(EndpointKind::CreateSession).len(), 2);
    let lookup = &transport.calls_to(EndpointKind::ExecuteSql)[0];
    let body = lookup.body.as_ref().unwrap();
    assert_eq!(body["session"], json!("session-2"));
    assert_eq!(body["transaction"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_unknown_primary_key_errors() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    // Introspection comes back empty: the table's key cannot be resolved.
    transport.script(EndpointKind::ExecuteSql, json!({ "rows": [] }));

    let err = coordinator
        .execute(
            "INSERT INTO test (field) VALUES (@a)",
            &params(&[("a", Value::Int(1))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownPrimaryKey(table) if table == "test"));
}

#[tokio::test]
async fn test_commit_without_transaction_makes_no_rpc() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator.commit().await.unwrap();

    assert!(transport.calls_to(EndpointKind::Commit).is_empty());
    assert!(transport.calls_to(EndpointKind::UpdateDdl).is_empty());
}

#[tokio::test]
async fn test_failed_commit_leaves_pending_state() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator
        .execute(
            "UPDATE test SET field = @a",
            &params(&[("a", Value::Int(1))]),
        )
        .await
        .unwrap();

    transport.script_error(EndpointKind::Commit, 500, "backend unavailable");
    let err = coordinator.commit().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    // Commit is the only point of no return; nothing was cleared.
    assert_eq!(coordinator.pending_mutation_count(), 1);
    assert_eq!(coordinator.transaction_token(), Some("txn-1"));
}

#[tokio::test]
async fn test_rollback_is_a_noop() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator
        .execute(
            "UPDATE test SET field = @a",
            &params(&[("a", Value::Int(1))]),
        )
        .await
        .unwrap();
    coordinator.rollback().await.unwrap();

    assert_eq!(coordinator.pending_mutation_count(), 1);
    assert_eq!(coordinator.transaction_token(), Some("txn-1"));
}

#[tokio::test]
async fn test_parse_error_surfaces_without_losing_transaction() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    let err = coordinator
        .execute("INSERT INTO test (a) VALUES (@missing)", &params(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Sql(_)));

    // The begin already happened; the malformed statement queued nothing.
    assert_eq!(coordinator.transaction_token(), Some("txn-1"));
    assert_eq!(coordinator.pending_mutation_count(), 0);
}

#[tokio::test]
async fn test_named_parameters_travel_with_types() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    coordinator
        .execute(
            "SELECT * FROM users WHERE id = @a AND name = @b",
            &params(&[("a", Value::Int(5)), ("b", "alice".into())]),
        )
        .await
        .unwrap();

    let body = transport.calls_to(EndpointKind::ExecuteSql)[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(body["params"], json!({ "a": "5", "b": "alice" }));
    assert_eq!(
        body["paramTypes"],
        json!({ "a": { "code": "INT64" }, "b": { "code": "STRING" } })
    );
}
