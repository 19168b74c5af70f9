//! # session-keeper
//!
//! Server-side cookie sessions for axum.
//!
//! Each client gets a server-stored bag of key-value state, found again on
//! later requests through a cookie carrying a random session identifier.
//! Handlers see the state as a mutable mapping; the middleware loads it before
//! dispatch and writes it back afterwards.
//!
//! ## Features
//!
//! - **Pluggable stores**: atomic file store, in-memory store, or any
//!   [`SessionStore`] implementation
//! - **Lazy identifiers**: no record and no cookie until a session is written
//! - **Idle timeouts**: expired sessions read as empty and are purged lazily
//! - **Out-of-band access**: testing mode lets harnesses open, seed and save
//!   sessions without a request cycle
//!
//! ## Quick Start
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use session_keeper::{Session, SessionManager, SessionSettings};
//!
//! #[tokio::main]
//! async fn main() -> session_keeper::Result<()> {
//!     session_keeper::logging::try_init().ok();
//!
//!     let settings: SessionSettings = serde_json::from_str(
//!         r#"{"SESSION_TYPE": "file", "SESSION_EXPIRES": true, "SESSION_DATA_DIR": "./sessions"}"#,
//!     )?;
//!     let manager = SessionManager::from_settings(&settings)?;
//!
//!     let app = Router::new()
//!         .route("/", get(|session: Session| async move {
//!             let visits = session.get::<u64>("visits")?.unwrap_or(0) + 1;
//!             session.set("visits", visits)?;
//!             Ok::<_, session_keeper::SessionError>(visits.to_string())
//!         }))
//!         .with_state(manager.clone());
//!     let app = manager.attach(app);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
//!         .await
//!         .map_err(session_keeper::SessionError::Server)?;
//!     axum::serve(listener, app)
//!         .await
//!         .map_err(session_keeper::SessionError::Server)
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod cookie;
pub mod error;
pub mod interface;
pub mod logging;
pub mod manager;
pub mod middleware;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::{CookieExpiry, CookieOptions, SessionOptions, SessionSettings, StoreType};
pub use cookie::SessionCookie;
pub use error::{Result, SessionError};
pub use interface::{ManagedSessionInterface, SessionInterface};
pub use manager::SessionManager;
pub use middleware::session_middleware;
pub use session::{SavePolicy, Session, SessionId, SessionRecord, SessionState};
pub use store::{FileStore, LoadOutcome, MemoryStore, SessionStore};
