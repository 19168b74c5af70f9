//! Backing stores for session records.
//!
//! Every backend implements [`SessionStore`]. Missing and expired records are
//! reported as [`LoadOutcome::NotFound`] rather than as errors; errors are
//! reserved for I/O and serialization failures.
//!
//! Two backends ship with the crate:
//!
//! - [`FileStore`]: one JSON file per session, written atomically
//! - [`MemoryStore`]: process-local map, mostly for tests
//!
//! Networked backends (cache servers, databases) implement the same trait and
//! are handed to [`crate::SessionManager::with_store`].

mod file;
mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{SessionOptions, StoreType};
use crate::error::SessionError;
use crate::session::{SessionId, SessionRecord};
use crate::Result;

/// Result of looking a session up in a store.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A live record.
    Found(SessionRecord),
    /// No record, or only an expired one.
    NotFound,
}

impl LoadOutcome {
    /// Convert into an `Option`.
    pub fn into_record(self) -> Option<SessionRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }

    /// Check whether a record was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Persistence contract for session records.
///
/// Implementations must make `save` atomic with respect to partial writes and
/// resolve concurrent saves of one identifier last-writer-wins. `delete` is
/// idempotent. `load` and `exists` treat expired records as absent.
#[async_trait]
pub trait SessionStore: Debug + Send + Sync + 'static {
    /// Load a live record.
    async fn load(&self, id: &SessionId) -> Result<LoadOutcome>;

    /// Write a record, replacing any previous version.
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Remove a record. Removing a missing record is not an error.
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Check whether a live record exists.
    async fn exists(&self, id: &SessionId) -> Result<bool> {
        Ok(self.load(id).await?.is_found())
    }

    /// Physically remove expired records, returning how many were removed.
    async fn sweep(&self) -> Result<usize>;
}

/// Build the store selected by `options`.
///
/// External store types cannot be built here; they must be supplied through
/// [`crate::SessionManager::with_store`].
pub fn build_store(options: &SessionOptions) -> Result<Arc<dyn SessionStore>> {
    match &options.store {
        StoreType::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreType::File => {
            let dir = options.data_dir.as_ref().ok_or_else(|| {
                SessionError::Configuration("SESSION_DATA_DIR is required for the file store".into())
            })?;
            Ok(Arc::new(FileStore::new(dir)?))
        }
        StoreType::External(name) => Err(SessionError::Configuration(format!(
            "store type '{}' has no built-in backend; supply one with SessionManager::with_store",
            name
        ))),
    }
}
