//! In-memory session store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

use async_trait::async_trait;

use super::{LoadOutcome, SessionStore};
use crate::error::SessionError;
use crate::session::{SessionId, SessionRecord};
use crate::Result;

/// Thread-safe, process-local storage for session records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, expired ones included.
    pub fn count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &SessionId) -> Result<LoadOutcome> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;

        let record = match records.get(id) {
            Some(record) => record.clone(),
            None => return Ok(LoadOutcome::NotFound),
        };

        if record.is_expired() {
            records.remove(id);
            return Ok(LoadOutcome::NotFound);
        }
        Ok(LoadOutcome::Found(record))
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        records.remove(id);
        Ok(())
    }

    async fn sweep(&self) -> Result<usize> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;

        let now = SystemTime::now();
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn record_with(data: &[(&str, serde_json::Value)]) -> SessionRecord {
        let mut record = SessionRecord::new(SessionId::generate());
        for (key, value) in data {
            record.data.insert((*key).to_string(), value.clone());
        }
        record
    }

    fn expired_record() -> SessionRecord {
        let mut record = record_with(&[("a", json!(1))]);
        record.expires_at = Some(SystemTime::now() - Duration::from_secs(1));
        record
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new();
        let record = record_with(&[("a", json!(1)), ("b", json!(2))]);

        store.save(&record).await.unwrap();

        let loaded = store.load(&record.id).await.unwrap().into_record().unwrap();
        assert_eq!(loaded.data, record.data);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = MemoryStore::new();
        let outcome = store.load(&SessionId::generate()).await.unwrap();
        assert_eq!(outcome, LoadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_expired_is_not_found() {
        let store = MemoryStore::new();
        let record = expired_record();
        store.save(&record).await.unwrap();

        assert!(!store.exists(&record.id).await.unwrap());
        assert_eq!(store.load(&record.id).await.unwrap(), LoadOutcome::NotFound);
        // Purged on access
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let record = record_with(&[("a", json!(1))]);
        store.save(&record).await.unwrap();

        store.delete(&record.id).await.unwrap();
        store.delete(&record.id).await.unwrap();
        assert!(!store.exists(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryStore::new();
        let mut record = record_with(&[("step", json!(1))]);
        store.save(&record).await.unwrap();

        record.data.insert("step".into(), json!(2));
        store.save(&record).await.unwrap();

        let loaded = store.load(&record.id).await.unwrap().into_record().unwrap();
        assert_eq!(loaded.data["step"], json!(2));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = MemoryStore::new();
        let live = record_with(&[("a", json!(1))]);

        tokio_test::block_on(async {
            store.save(&live).await.unwrap();
            store.save(&expired_record()).await.unwrap();
            store.save(&expired_record()).await.unwrap();

            assert_eq!(store.sweep().await.unwrap(), 2);
        });

        assert_eq!(store.count(), 1);
        assert!(tokio_test::block_on(store.exists(&live.id)).unwrap());
    }

    #[test]
    fn test_concurrent_saves() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for i in 0..100 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let record = record_with(&[("n", json!(i))]);
                tokio_test::block_on(store.save(&record)).unwrap();
                record.id
            }));
        }

        let ids: Vec<SessionId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 100);
        assert_eq!(store.count(), 100);
    }
}
