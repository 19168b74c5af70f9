//! Error types for session-keeper.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Main error type for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A mandatory option is missing or invalid, or out-of-band access was
    /// attempted without testing mode.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backing store I/O failure.
    #[error("session store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    /// Record or value could not be (de)serialized.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by an external store backend.
    #[error("session store error: {0}")]
    Store(String),

    /// Identifier does not have the expected shape.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    /// `pop` on a key that is not present.
    #[error("key not found in session: {0}")]
    KeyMissing(String),

    /// Mutation attempted after the session was deleted.
    #[error("session has been deleted")]
    SessionDeleted,

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::SessionState,
        to: crate::session::SessionState,
    },

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Listener could not be bound or the server loop failed.
    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Convenience Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Short machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::StoreIo(_) | Self::Store(_) => "SESSION_STORE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::InvalidSessionId(_) => "INVALID_SESSION_ID",
            Self::KeyMissing(_) => "KEY_NOT_FOUND",
            Self::SessionDeleted => "SESSION_DELETED",
            Self::InvalidStateTransition { .. } => "INVALID_STATE",
            Self::LockPoisoned => "INTERNAL_ERROR",
            Self::Server(_) => "SERVER_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::KeyMissing(_) => StatusCode::NOT_FOUND,
            Self::SessionDeleted => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "session failure");
        }
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
