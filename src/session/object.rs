//! The per-request session object.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{SessionId, SessionRecord, SessionState};
use crate::error::SessionError;
use crate::store::SessionStore;
use crate::Result;

/// When a session object writes itself back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavePolicy {
    /// Idle timeout applied at every write.
    pub idle_timeout: Option<Duration>,
    /// Rewrite bound sessions even when clean, refreshing their expiry.
    pub save_accessed_time: bool,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    id: Option<SessionId>,
    data: HashMap<String, Value>,
    created_at: SystemTime,
    accessed_at: SystemTime,
    expires_at: Option<SystemTime>,
    /// Identifier came from a request cookie.
    loaded: bool,
    /// Identifier was minted during this request.
    minted: bool,
    cookie_issued: bool,
    /// Identifier of a record that idled out while held, still to be purged.
    expired_id: Option<SessionId>,
}

impl Inner {
    fn fresh() -> Self {
        let now = SystemTime::now();
        Self {
            state: SessionState::Unbound,
            id: None,
            data: HashMap::new(),
            created_at: now,
            accessed_at: now,
            expires_at: None,
            loaded: false,
            minted: false,
            cookie_issued: false,
            expired_id: None,
        }
    }

    /// Drop a session whose idle timeout ran out while it was held.
    fn expire_if_due(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let due = matches!(self.expires_at, Some(at) if at <= SystemTime::now());
        if due {
            debug!(session_id = ?self.id, "session expired while in use");
            let expired_id = self.id.take();
            let loaded = self.loaded;
            *self = Inner::fresh();
            self.loaded = loaded;
            self.expired_id = expired_id;
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.state.is_terminal() {
            Err(SessionError::SessionDeleted)
        } else {
            Ok(())
        }
    }

    fn mark_dirty(&mut self) -> Result<()> {
        if self.state != SessionState::Dirty {
            self.state.transition_to(SessionState::Dirty)?;
        }
        Ok(())
    }

    /// Build the record to write, minting an identifier if needed.
    fn prepare_record(&mut self, policy: &SavePolicy) -> SessionRecord {
        let id = match self.id.clone() {
            Some(id) => id,
            None => {
                let id = SessionId::generate();
                self.id = Some(id.clone());
                self.minted = true;
                self.created_at = SystemTime::now();
                id
            }
        };

        let mut record = SessionRecord {
            id,
            data: self.data.clone(),
            created_at: self.created_at,
            accessed_at: self.accessed_at,
            expires_at: self.expires_at,
        };
        record.touch(policy.idle_timeout);
        self.accessed_at = record.accessed_at;
        self.expires_at = record.expires_at;
        record
    }
}

enum SaveAction {
    Skip,
    Write(SessionRecord),
    Remove(SessionId),
}

/// A client's session during one request.
///
/// The object is a mutable mapping from string keys to JSON values. Clones
/// share state, so the middleware and the handler see the same session. The
/// identifier is minted lazily on the first write, which keeps requests that
/// never touch their session free of store writes and cookies.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    store: Arc<dyn SessionStore>,
    policy: SavePolicy,
}

impl Session {
    /// Create an unbound session with no identifier.
    pub fn new(store: Arc<dyn SessionStore>, policy: SavePolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::fresh())),
            store,
            policy,
        }
    }

    /// Bind a session to a record loaded from the store.
    ///
    /// The access time is set to now; the record's expiry is recomputed from
    /// the policy's idle timeout.
    pub fn from_record(
        mut record: SessionRecord,
        store: Arc<dyn SessionStore>,
        policy: SavePolicy,
    ) -> Self {
        record.touch(policy.idle_timeout);
        let inner = Inner {
            state: SessionState::Clean,
            id: Some(record.id),
            data: record.data,
            created_at: record.created_at,
            accessed_at: record.accessed_at,
            expires_at: record.expires_at,
            loaded: true,
            minted: false,
            cookie_issued: false,
            expired_id: None,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            store,
            policy,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| SessionError::LockPoisoned)
    }

    /// Session identifier, if one has been loaded or minted.
    pub fn id(&self) -> Option<SessionId> {
        self.lock().ok().and_then(|inner| inner.id.clone())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lock().map(|inner| inner.state).unwrap_or_default()
    }

    /// Whether the identifier was minted during this request.
    pub fn is_new(&self) -> bool {
        self.lock().map(|inner| inner.minted).unwrap_or(false)
    }

    /// Whether the identifier arrived with the request.
    pub fn was_loaded(&self) -> bool {
        self.lock().map(|inner| inner.loaded).unwrap_or(false)
    }

    /// Time the session was created.
    pub fn created_at(&self) -> Option<SystemTime> {
        self.lock().ok().map(|inner| inner.created_at)
    }

    /// Time of the last load or save.
    pub fn accessed_at(&self) -> Option<SystemTime> {
        self.lock().ok().map(|inner| inner.accessed_at)
    }

    /// Whether a freshly minted identifier still needs its cookie.
    pub fn needs_cookie(&self) -> bool {
        self.lock()
            .map(|inner| inner.minted && !inner.cookie_issued && !inner.state.is_terminal())
            .unwrap_or(false)
    }

    /// Whether the client holds a cookie for a session that no longer exists.
    pub fn needs_removal_cookie(&self) -> bool {
        self.lock()
            .map(|inner| inner.loaded && (inner.state.is_terminal() || inner.id.is_none()))
            .unwrap_or(false)
    }

    /// Record that the identifier cookie has been written to a response.
    pub fn mark_cookie_issued(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.cookie_issued = true;
        }
    }

    /// Get a raw JSON value.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let mut inner = self.lock()?;
        inner.expire_if_due();
        Ok(inner.data.get(key).cloned())
    }

    /// Get a value, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Set a value, marking the session dirty.
    pub fn set(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.lock()?;
        inner.ensure_writable()?;
        inner.expire_if_due();
        inner.data.insert(key.into(), value);
        inner.mark_dirty()
    }

    /// Remove a value and return it, or fail with `KeyMissing`.
    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = {
            let mut inner = self.lock()?;
            inner.ensure_writable()?;
            inner.expire_if_due();
            let value = inner
                .data
                .remove(key)
                .ok_or_else(|| SessionError::KeyMissing(key.to_string()))?;
            inner.mark_dirty()?;
            value
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Check whether `key` is present. An expired session contains nothing.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        inner.expire_if_due();
        Ok(inner.data.contains_key(key))
    }

    /// All keys currently set.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut inner = self.lock()?;
        inner.expire_if_due();
        let mut keys: Vec<String> = inner.data.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Copy of the whole mapping.
    pub fn to_map(&self) -> Result<HashMap<String, Value>> {
        let mut inner = self.lock()?;
        inner.expire_if_due();
        Ok(inner.data.clone())
    }

    /// Number of keys.
    pub fn len(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        inner.expire_if_due();
        Ok(inner.data.len())
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every key. Saving an emptied session deletes its record.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.ensure_writable()?;
        inner.expire_if_due();
        if inner.data.is_empty() && inner.state == SessionState::Unbound {
            return Ok(());
        }
        inner.data.clear();
        inner.mark_dirty()
    }

    /// Remove the session's record from the store.
    ///
    /// The object becomes unusable for writes. Calling this again is a no-op
    /// apart from repeating the idempotent store delete.
    pub async fn delete(&self) -> Result<()> {
        let id = {
            let mut inner = self.lock()?;
            inner.data.clear();
            inner.state.transition_to(SessionState::Deleted)?;
            inner.id.clone().or_else(|| inner.expired_id.take())
        };

        if let Some(id) = id {
            self.store.delete(&id).await?;
            debug!(session_id = %id, "session deleted");
        }
        Ok(())
    }

    /// Write the session back if it is dirty or the policy forces a write.
    ///
    /// Returns whether the store was touched.
    pub async fn save(&self) -> Result<bool> {
        let (action, expired_id) = {
            let mut inner = self.lock()?;
            inner.expire_if_due();
            let expired_id = inner.expired_id.take();
            let action = match inner.state {
                SessionState::Deleted | SessionState::Unbound => SaveAction::Skip,
                SessionState::Dirty if inner.data.is_empty() => match inner.id.clone() {
                    Some(id) => SaveAction::Remove(id),
                    None => SaveAction::Skip,
                },
                SessionState::Dirty => SaveAction::Write(inner.prepare_record(&self.policy)),
                SessionState::Clean | SessionState::Saved if self.policy.save_accessed_time => {
                    SaveAction::Write(inner.prepare_record(&self.policy))
                }
                SessionState::Clean | SessionState::Saved => SaveAction::Skip,
            };
            (action, expired_id)
        };

        let purged = match expired_id {
            Some(id) => {
                self.store.delete(&id).await?;
                debug!(session_id = %id, "expired session removed from store");
                true
            }
            None => false,
        };

        match action {
            SaveAction::Skip => {
                // An emptied, never-stored session goes back to unbound.
                let mut inner = self.lock()?;
                if inner.state == SessionState::Dirty && inner.data.is_empty() {
                    let loaded = inner.loaded;
                    *inner = Inner::fresh();
                    inner.loaded = loaded;
                }
                Ok(purged)
            }
            SaveAction::Remove(id) => {
                self.store.delete(&id).await?;
                debug!(session_id = %id, "emptied session removed from store");
                let mut inner = self.lock()?;
                let loaded = inner.loaded;
                *inner = Inner::fresh();
                inner.loaded = loaded;
                Ok(true)
            }
            SaveAction::Write(record) => self.write(record).await.map(|()| true),
        }
    }

    /// Write the session even when it is clean.
    ///
    /// Used by out-of-band access, where the write must be visible before the
    /// cookie is read. Mints an identifier for unbound sessions.
    pub async fn persist(&self) -> Result<()> {
        let (record, expired_id) = {
            let mut inner = self.lock()?;
            inner.ensure_writable()?;
            inner.expire_if_due();
            let expired_id = inner.expired_id.take();
            (inner.prepare_record(&self.policy), expired_id)
        };
        if let Some(id) = expired_id {
            self.store.delete(&id).await?;
        }
        self.write(record).await
    }

    async fn write(&self, record: SessionRecord) -> Result<()> {
        self.store.save(&record).await?;
        debug!(session_id = %record.id, keys = record.data.len(), "session saved");

        let mut inner = self.lock()?;
        if inner.state != SessionState::Deleted {
            inner.state.transition_to(SessionState::Saved)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish()
    }
}
