//! Framework session interface.
//!
//! [`SessionInterface`] is the seam between the host framework's per-request
//! session accessor and the session manager. Handlers reach it through the
//! [`Session`] extractor; test harnesses call it directly to open and save
//! sessions without a live request cycle.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Response,
};

use crate::cookie::SessionCookie;
use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::session::Session;
use crate::Result;

/// Open and save sessions on behalf of the host framework.
#[async_trait]
pub trait SessionInterface: Send + Sync {
    /// Return the session for the request described by `parts`.
    async fn open_session(&self, parts: &mut Parts) -> Result<Session>;

    /// Persist `session` and record anything the response must carry.
    async fn save_session(&self, session: &Session, response: &mut Response) -> Result<()>;
}

/// [`SessionInterface`] backed by a [`SessionManager`].
///
/// Normally the middleware has already attached a session to the request.
/// When it has not, testing mode falls back to the manager's restoration
/// path; outside testing mode that is a configuration error.
#[derive(Debug, Clone)]
pub struct ManagedSessionInterface {
    manager: SessionManager,
    testing: bool,
}

impl ManagedSessionInterface {
    /// Interface using the manager's `testing` option.
    pub fn new(manager: SessionManager) -> Self {
        let testing = manager.options().testing;
        Self { manager, testing }
    }

    /// Whether out-of-band access is allowed.
    pub fn is_testing(&self) -> bool {
        self.testing
    }
}

#[async_trait]
impl SessionInterface for ManagedSessionInterface {
    async fn open_session(&self, parts: &mut Parts) -> Result<Session> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        if !self.testing {
            return Err(SessionError::Configuration(
                "no session attached to the request; install the session middleware, \
                 or enable SESSION_TESTING for out-of-band access"
                    .into(),
            ));
        }
        self.manager.restore_session(parts).await
    }

    async fn save_session(&self, session: &Session, response: &mut Response) -> Result<()> {
        // Saving an emptied session removes its record; it must not come back.
        let emptied = session.state().is_dirty() && session.is_empty()?;
        session.save().await?;
        if !self.testing {
            return Ok(());
        }

        if !emptied && !session.state().is_terminal() {
            session.persist().await?;
        }

        if session.needs_cookie() {
            if let Some(id) = session.id() {
                self.manager.cookie_for(&id).apply(response.headers_mut())?;
                session.mark_cookie_issued();
            }
        } else if session.needs_removal_cookie() {
            SessionCookie::removal(&self.manager.options().cookie).apply(response.headers_mut())?;
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let manager = SessionManager::from_ref(state);
        ManagedSessionInterface::new(manager)
            .open_session(parts)
            .await
    }
}
