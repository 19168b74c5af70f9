//! API request and response types.

use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::Session;
use crate::Result;

/// Body of `PUT /session/{key}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PutValueRequest {
    /// Any JSON value.
    pub value: Value,
}

/// View of a session as returned by the demo routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshotResponse {
    /// Identifier, absent until the session is first saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Lifecycle state name.
    pub state: String,
    /// True when the session arrived with the request's cookie.
    pub loaded: bool,
    /// Creation time as seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// Session contents, ordered by key.
    pub data: BTreeMap<String, Value>,
}

impl SessionSnapshotResponse {
    pub fn from_session(session: &Session) -> Result<Self> {
        Ok(Self {
            session_id: session.id().map(|id| id.to_string()),
            state: format!("{:?}", session.state()),
            loaded: session.was_loaded(),
            created_at: session
                .created_at()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            data: session.to_map()?.into_iter().collect(),
        })
    }
}

/// Response of `GET /visits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitsResponse {
    /// Number of requests this client has made to the route.
    pub visits: u64,
}
