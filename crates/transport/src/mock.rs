//! In-memory mock transport for tests
//!
//! Mirrors the request/response surface of a real HTTP transport. Responses
//! are scripted per endpoint kind and consumed in order; endpoints with no
//! script left fall back to synthesized defaults (fresh session and
//! transaction ids, empty result sets, completed operations), so most tests
//! only script the calls they care about.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::{Endpoint, EndpointKind, Method, Result, Transport, TransportError};

/// One request the mock has seen, in order.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: EndpointKind,
    pub method: Method,
    pub body: Option<serde_json::Value>,
}

enum Scripted {
    Response(serde_json::Value),
    Error { status: u16, body: String },
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    scripted: HashMap<EndpointKind, VecDeque<Scripted>>,
    sessions: u64,
    transactions: u64,
    operations: u64,
}

/// Scripted in-memory transport. Internally synchronized so tests can share
/// it through an `Arc` with the coordinator under test.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unscripted call to `kind`.
    pub fn script(&self, kind: EndpointKind, response: serde_json::Value) {
        self.state
            .lock()
            .scripted
            .entry(kind)
            .or_default()
            .push_back(Scripted::Response(response));
    }

    /// Queue a non-2xx failure for the next call to `kind`.
    pub fn script_error(&self, kind: EndpointKind, status: u16, body: impl Into<String>) {
        self.state
            .lock()
            .scripted
            .entry(kind)
            .or_default()
            .push_back(Scripted::Error {
                status,
                body: body.into(),
            });
    }

    /// All calls seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls to one endpoint kind, in order.
    pub fn calls_to(&self, kind: EndpointKind) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint == kind)
            .cloned()
            .collect()
    }

    fn default_response(
        state: &mut MockState,
        endpoint: EndpointKind,
        body: Option<&serde_json::Value>,
    ) -> serde_json::Value {
        match endpoint {
            EndpointKind::CreateSession => {
                state.sessions += 1;
                json!({
                    "name": format!(
                        "projects/p/instances/i/databases/d/sessions/session-{}",
                        state.sessions
                    )
                })
            }
            EndpointKind::BeginTransaction => {
                state.transactions += 1;
                json!({ "id": format!("txn-{}", state.transactions) })
            }
            EndpointKind::ExecuteSql => {
                let mut response = json!({
                    "rows": [],
                    "metadata": { "rowType": { "fields": [] } }
                });
                // The backend returns a fresh transaction only when the
                // request asked to begin one.
                let begins = body
                    .and_then(|b| b.get("transaction"))
                    .and_then(|t| t.get("begin"))
                    .is_some();
                if begins {
                    state.transactions += 1;
                    response["transaction"] =
                        json!({ "id": format!("txn-{}", state.transactions) });
                }
                response
            }
            EndpointKind::Commit => json!({}),
            EndpointKind::UpdateDdl => {
                state.operations += 1;
                json!({ "name": format!("operations/op-{}", state.operations) })
            }
            EndpointKind::GetDdl => json!({ "statements": [] }),
            EndpointKind::GetOperation => json!({ "done": true }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        endpoint: Endpoint<'_>,
        body: Option<serde_json::Value>,
        method: Method,
    ) -> Result<serde_json::Value> {
        let kind = endpoint.kind();
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            endpoint: kind,
            method,
            body: body.clone(),
        });

        let scripted = state
            .scripted
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error { status, body }) => Err(TransportError::Status { status, body }),
            None => Ok(Self::default_response(&mut state, kind, body.as_ref())),
        }
    }
}
