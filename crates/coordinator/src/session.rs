//! Backend session handling
//!
//! Every call is scoped to a backend-allocated session. The connection owns
//! one long-lived session; primary-key introspection uses transient ones so
//! it never disturbs the connection's transaction state.

use serde_json::json;
use spandb_transport::{Endpoint, Method, Transport};

use crate::error::{Error, Result};

/// Allocate a session and return its id.
///
/// The backend answers with the session's full resource name; the id is the
/// trailing path segment.
pub(crate) async fn create<T: Transport>(transport: &T) -> Result<String> {
    let response = transport
        .send(Endpoint::CreateSession, Some(json!({})), Method::Post)
        .await?;
    let name = response
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::MalformedResponse("session create response missing name".into()))?;
    Ok(name.rsplit('/').next().unwrap_or(name).to_string())
}

/// Release a session. The backend reaps idle sessions on its own and no
/// teardown call is made here; this is an accepted gap.
pub(crate) async fn destroy<T: Transport>(_transport: &T, _session: &str) -> Result<()> {
    Ok(())
}
