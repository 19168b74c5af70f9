//! Session management module.
//!
//! This module provides the session identifier, the persisted record, the
//! lifecycle state machine and the per-request session object.

mod id;
mod object;
mod record;
mod state;

pub use id::SessionId;
pub use object::{SavePolicy, Session};
pub use record::SessionRecord;
pub use state::SessionState;
