//! REST API handlers.

use axum::{
    extract::{FromRef, Path},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::types::{PutValueRequest, SessionSnapshotResponse, VisitsResponse};
use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::session::Session;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

type ApiResult<T> = Result<T, SessionError>;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Snapshot of the current session.
pub async fn get_session(session: Session) -> ApiResult<Json<SessionSnapshotResponse>> {
    Ok(Json(SessionSnapshotResponse::from_session(&session)?))
}

/// Delete the session. The middleware clears the client's cookie.
pub async fn delete_session(session: Session) -> ApiResult<StatusCode> {
    session.delete().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove every key from the session.
pub async fn clear_session(session: Session) -> ApiResult<Json<SessionSnapshotResponse>> {
    session.clear()?;
    Ok(Json(SessionSnapshotResponse::from_session(&session)?))
}

/// Read one value.
pub async fn get_value(session: Session, Path(key): Path<String>) -> ApiResult<Json<Value>> {
    session
        .get_value(&key)?
        .map(Json)
        .ok_or(SessionError::KeyMissing(key))
}

/// Store one value.
pub async fn put_value(
    session: Session,
    Path(key): Path<String>,
    Json(req): Json<PutValueRequest>,
) -> ApiResult<Json<SessionSnapshotResponse>> {
    session.set(key, req.value)?;
    Ok(Json(SessionSnapshotResponse::from_session(&session)?))
}

/// Remove one value and return it.
pub async fn delete_value(session: Session, Path(key): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(session.pop(&key)?))
}

/// Count this client's visits.
pub async fn visits(session: Session) -> ApiResult<Json<VisitsResponse>> {
    let visits = session.get::<u64>("visits")?.unwrap_or(0) + 1;
    session.set("visits", visits)?;
    Ok(Json(VisitsResponse { visits }))
}
