//! Session manager: resolved options plus the backing store.

use std::sync::Arc;

use axum::http::{request::Parts, HeaderMap};
use tracing::{debug, info};

use crate::config::{SessionOptions, SessionSettings};
use crate::cookie::{session_id_from_headers, SessionCookie};
use crate::session::{SavePolicy, Session, SessionId};
use crate::store::{build_store, LoadOutcome, SessionStore};
use crate::Result;

struct ManagerInner {
    options: SessionOptions,
    store: Arc<dyn SessionStore>,
}

/// Entry point for loading, restoring and finalizing sessions.
///
/// Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Create a manager with the store selected by `options`.
    pub fn new(options: SessionOptions) -> Result<Self> {
        let store = build_store(&options)?;
        Ok(Self::with_store(options, store))
    }

    /// Create a manager from raw settings, validating them first.
    pub fn from_settings(settings: &SessionSettings) -> Result<Self> {
        Self::new(settings.resolve()?)
    }

    /// Create a manager around a caller-supplied store.
    pub fn with_store(options: SessionOptions, store: Arc<dyn SessionStore>) -> Self {
        info!(
            store = ?options.store,
            cookie = %options.cookie.name,
            idle_timeout = ?options.idle_timeout,
            testing = options.testing,
            "session manager initialized"
        );
        Self {
            inner: Arc::new(ManagerInner { options, store }),
        }
    }

    /// Resolved options.
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    fn policy(&self) -> SavePolicy {
        SavePolicy {
            idle_timeout: self.inner.options.idle_timeout,
            save_accessed_time: self.inner.options.save_accessed_time,
        }
    }

    /// Create an unbound session.
    pub fn fresh_session(&self) -> Session {
        Session::new(Arc::clone(&self.inner.store), self.policy())
    }

    /// Load the session for `id`, or a fresh one when there is no live record.
    pub async fn load(&self, id: Option<&SessionId>) -> Result<Session> {
        let Some(id) = id else {
            return Ok(self.fresh_session());
        };

        match self.inner.store.load(id).await? {
            LoadOutcome::Found(record) => {
                debug!(session_id = %id, "session loaded");
                Ok(Session::from_record(
                    record,
                    Arc::clone(&self.inner.store),
                    self.policy(),
                ))
            }
            LoadOutcome::NotFound => {
                debug!(session_id = %id, "unknown or expired session, starting fresh");
                Ok(self.fresh_session())
            }
        }
    }

    /// Load the session named by the request's cookie.
    pub async fn load_from_headers(&self, headers: &HeaderMap) -> Result<Session> {
        let id = session_id_from_headers(headers, &self.inner.options.cookie.name);
        self.load(id.as_ref()).await
    }

    /// Rebuild a session outside the middleware and attach it to the request.
    ///
    /// Used for out-of-band access where no middleware ran for `parts`.
    pub async fn restore_session(&self, parts: &mut Parts) -> Result<Session> {
        let session = self.load_from_headers(&parts.headers).await?;
        parts.extensions.insert(session.clone());
        debug!(session_id = ?session.id(), "session restored out of band");
        Ok(session)
    }

    /// Cookie carrying `id`, with the configured lifetime and attributes.
    pub fn cookie_for(&self, id: &SessionId) -> SessionCookie {
        let options = &self.inner.options;
        SessionCookie::issue(&options.cookie, options.cookie_expiry, id)
    }

    /// Save the session at the end of a request and decide on the cookie.
    ///
    /// Returns the cookie to set: the identifier cookie when one was minted
    /// and not yet issued, a removal cookie when the client's session was
    /// deleted, otherwise nothing.
    pub async fn finalize(&self, session: &Session) -> Result<Option<SessionCookie>> {
        session.save().await?;

        if session.needs_cookie() {
            if let Some(id) = session.id() {
                session.mark_cookie_issued();
                return Ok(Some(self.cookie_for(&id)));
            }
        }
        if session.needs_removal_cookie() {
            return Ok(Some(SessionCookie::removal(&self.inner.options.cookie)));
        }
        Ok(None)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("options", &self.inner.options)
            .field("store", &self.inner.store)
            .finish()
    }
}
