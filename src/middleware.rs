//! Session middleware for axum.
//!
//! The middleware resolves the request's session before dispatch, exposes it
//! through request extensions, and after the handler returns saves it and
//! emits the session cookie when one is needed.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use session_keeper::{CookieExpiry, Session, SessionManager, SessionOptions, StoreType};
//!
//! # fn build() -> session_keeper::Result<Router> {
//! let manager = SessionManager::new(SessionOptions::new(
//!     StoreType::Memory,
//!     CookieExpiry::BrowserSession,
//! ))?;
//!
//! let app = Router::new()
//!     .route("/", get(|session: Session| async move {
//!         session.set("seen", true).map(|_| "hello")
//!     }))
//!     .with_state(manager.clone());
//! Ok(manager.attach(app))
//! # }
//! ```

use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::Response,
    Router,
};

use crate::error::SessionError;
use crate::manager::SessionManager;

/// Session middleware.
///
/// Store failures while loading or saving fail the request, so a handler's
/// mutation is never silently dropped.
pub async fn session_middleware(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Result<Response, SessionError> {
    let session = manager.load_from_headers(request.headers()).await?;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if let Some(cookie) = manager.finalize(&session).await? {
        cookie.apply(response.headers_mut())?;
    }
    Ok(response)
}

impl SessionManager {
    /// Wrap every route of `router` with [`session_middleware`].
    pub fn attach<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(from_fn_with_state(self.clone(), session_middleware))
    }
}
