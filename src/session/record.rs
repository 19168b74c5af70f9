//! The persisted session record.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SessionId;

/// The unit a backing store persists for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: SessionId,
    /// Session payload.
    #[serde(default)]
    pub data: HashMap<String, Value>,
    /// Time the record was first written.
    pub created_at: SystemTime,
    /// Time of the last load or save.
    pub accessed_at: SystemTime,
    /// Absolute expiry, or `None` when the session never idles out.
    #[serde(default)]
    pub expires_at: Option<SystemTime>,
}

impl SessionRecord {
    /// Create an empty record for the given identifier.
    pub fn new(id: SessionId) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            data: HashMap::new(),
            created_at: now,
            accessed_at: now,
            expires_at: None,
        }
    }

    /// Mark the record as accessed now and recompute its expiry.
    pub fn touch(&mut self, idle_timeout: Option<Duration>) {
        let now = SystemTime::now();
        self.accessed_at = now;
        self.expires_at = idle_timeout.map(|timeout| now + timeout);
    }

    /// Check whether the record had expired at `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// Check whether the record has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_never_expires() {
        let record = SessionRecord::new(SessionId::generate());
        assert!(record.data.is_empty());
        assert!(record.expires_at.is_none());
        assert!(!record.is_expired());
    }

    #[test]
    fn test_touch_sets_expiry() {
        let mut record = SessionRecord::new(SessionId::generate());
        record.touch(Some(Duration::from_secs(3)));

        let expires_at = record.expires_at.unwrap();
        assert_eq!(
            expires_at.duration_since(record.accessed_at).unwrap(),
            Duration::from_secs(3)
        );
        assert!(!record.is_expired());
        assert!(record.is_expired_at(record.accessed_at + Duration::from_secs(6)));
    }

    #[test]
    fn test_touch_without_timeout_clears_expiry() {
        let mut record = SessionRecord::new(SessionId::generate());
        record.touch(Some(Duration::from_secs(3)));
        record.touch(None);
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut record = SessionRecord::new(SessionId::generate());
        record.data.insert("a".into(), Value::from(1));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], record.id.as_str());
        assert_eq!(json["data"]["a"], 1);
        assert!(json["expires_at"].is_null());
    }
}
