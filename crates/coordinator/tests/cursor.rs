//! Cursor surface: positional parameters, row iteration, descriptions and
//! lastrowid.

mod common;

use std::sync::Arc;

use serde_json::json;
use spandb_coordinator::{ColumnDescription, Value};
use spandb_transport::{EndpointKind, MockTransport};

use common::{connect, SequenceGenerator};

#[tokio::test]
async fn test_positional_parameters_are_renamed() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    let mut cursor = coordinator.cursor();
    cursor
        .execute(
            "SELECT * FROM users WHERE id = ? AND name = ?",
            vec![Value::Int(5), "alice".into()],
        )
        .await
        .unwrap();
    drop(cursor);

    let body = transport.calls_to(EndpointKind::ExecuteSql)[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(
        body["sql"],
        json!("SELECT * FROM users WHERE id = @a AND name = @b")
    );
    assert_eq!(body["params"], json!({ "a": "5", "b": "alice" }));
}

#[tokio::test]
async fn test_row_iteration_and_description() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    transport.script(
        EndpointKind::ExecuteSql,
        json!({
            "rows": [["1", "alice"], ["2", "bob"], ["3", "carol"]],
            "metadata": { "rowType": { "fields": [
                { "name": "id", "type": { "code": "INT64" } },
                { "name": "name", "type": { "code": "STRING" } }
            ] } }
        }),
    );

    let mut cursor = coordinator.cursor();
    cursor.execute("SELECT * FROM users", vec![]).await.unwrap();

    assert_eq!(cursor.rowcount(), 3);
    assert_eq!(cursor.fetchone(), Some(json!(["1", "alice"])));
    assert_eq!(cursor.fetchmany(1), vec![json!(["2", "bob"])]);
    assert_eq!(cursor.fetchall(), vec![json!(["3", "carol"])]);
    assert_eq!(cursor.fetchone(), None);

    assert_eq!(
        cursor.description().unwrap(),
        vec![
            ColumnDescription {
                name: "id".into(),
                type_code: "INT64".into()
            },
            ColumnDescription {
                name: "name".into(),
                type_code: "STRING".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_lastrowid_reflects_backfilled_insert() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;
    coordinator.set_id_generator(Box::new(SequenceGenerator(76)));
    transport.script(
        EndpointKind::ExecuteSql,
        json!({ "rows": [["test", "id"]] }),
    );

    let mut cursor = coordinator.cursor();
    cursor
        .execute(
            "INSERT INTO test (field) VALUES (?)",
            vec![Value::Int(1)],
        )
        .await
        .unwrap();

    assert_eq!(cursor.lastrowid(), Some(77));
    assert_eq!(cursor.rowcount(), 0);
}

#[tokio::test]
async fn test_fetch_before_execute_is_empty() {
    let transport = Arc::new(MockTransport::new());
    let mut coordinator = connect(&transport).await;

    let mut cursor = coordinator.cursor();
    assert_eq!(cursor.fetchone(), None);
    assert!(cursor.fetchall().is_empty());
    assert_eq!(cursor.rowcount(), 0);
    assert!(cursor.description().is_none());
}
