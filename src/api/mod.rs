//! Demo HTTP application for session-keeper.
//!
//! A small axum application that exercises the session layer end to end.
//! Every route sees the request's [`Session`](crate::Session) through the
//! extractor; the middleware installed by [`create_router`] saves it after
//! the handler returns.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /session` - Snapshot of the current session
//! - `DELETE /session` - Delete the session and its record
//! - `POST /session/clear` - Remove every key
//! - `GET /session/{key}` - Read one value
//! - `PUT /session/{key}` - Store one value
//! - `DELETE /session/{key}` - Remove one value and return it
//! - `GET /visits` - Per-client visit counter
//!
//! ## Example
//!
//! ```no_run
//! use session_keeper::{api, CookieExpiry, SessionManager, SessionOptions, StoreType};
//!
//! #[tokio::main]
//! async fn main() -> session_keeper::Result<()> {
//!     let manager = SessionManager::new(SessionOptions::new(
//!         StoreType::Memory,
//!         CookieExpiry::BrowserSession,
//!     ))?;
//!     api::serve("127.0.0.1:3000", manager).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use handlers::AppState;
pub use router::{create_router, create_router_with_state, serve};
pub use types::{PutValueRequest, SessionSnapshotResponse, VisitsResponse};
