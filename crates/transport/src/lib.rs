//! Transport seam between the driver and the backend
//!
//! The driver only knows logical endpoints, HTTP methods and JSON payloads;
//! URL templating, credentials and the HTTP stack live behind the
//! [`Transport`] trait. [`MockTransport`] provides an in-memory scripted
//! implementation for tests.

use async_trait::async_trait;
use thiserror::Error;

pub mod mock;

pub use mock::{MockTransport, RecordedCall};

/// HTTP method for a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
}

/// A logical backend endpoint. Turning these into concrete URLs is the
/// transport implementation's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// POST: allocate a new session.
    CreateSession,
    /// POST: execute a read query on a session.
    ExecuteSql { session: &'a str },
    /// POST: begin a transaction on a session.
    BeginTransaction { session: &'a str },
    /// POST: commit a transaction's mutations on a session.
    Commit { session: &'a str },
    /// PATCH: submit a batch of schema-change statements.
    UpdateDdl,
    /// GET: fetch the database's current schema statements.
    GetDdl,
    /// GET: poll a long-running schema-change operation.
    GetOperation { operation: &'a str },
}

impl Endpoint<'_> {
    /// The endpoint's kind, independent of the resources it addresses.
    pub fn kind(&self) -> EndpointKind {
        match self {
            Endpoint::CreateSession => EndpointKind::CreateSession,
            Endpoint::ExecuteSql { .. } => EndpointKind::ExecuteSql,
            Endpoint::BeginTransaction { .. } => EndpointKind::BeginTransaction,
            Endpoint::Commit { .. } => EndpointKind::Commit,
            Endpoint::UpdateDdl => EndpointKind::UpdateDdl,
            Endpoint::GetDdl => EndpointKind::GetDdl,
            Endpoint::GetOperation { .. } => EndpointKind::GetOperation,
        }
    }
}

/// Owned endpoint discriminant, used for scripting and call assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    CreateSession,
    ExecuteSql,
    BeginTransaction,
    Commit,
    UpdateDdl,
    GetDdl,
    GetOperation,
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend answered with a non-2xx status.
    #[error("backend request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A stateless request/response channel to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the decoded JSON response body.
    async fn send(
        &self,
        endpoint: Endpoint<'_>,
        body: Option<serde_json::Value>,
        method: Method,
    ) -> Result<serde_json::Value>;
}
