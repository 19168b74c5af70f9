//! Filesystem session store.
//!
//! Layout: one file per session directly under the data directory, named by
//! the session identifier and holding the JSON-serialized record. Writes go
//! to a uniquely named temp file in the same directory and are then renamed
//! over the target, so readers only ever see complete records.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use rand::{rngs::OsRng, Rng};
use tokio::fs;
use tracing::{debug, warn};

use super::{LoadOutcome, SessionStore};
use crate::session::{SessionId, SessionRecord};
use crate::Result;

/// Prefix of in-flight temp files.
const TEMP_PREFIX: &str = ".tmp-";

/// Temp files older than this were left behind by an interrupted save.
const STALE_TEMP_AGE: Duration = Duration::from_secs(60);

/// Session store that keeps one file per session.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    fn temp_path_for(&self, id: &SessionId) -> PathBuf {
        let nonce: u64 = OsRng.gen();
        self.dir
            .join(format!("{}{}-{:016x}", TEMP_PREFIX, id.as_str(), nonce))
    }

    /// Read and decode a record file. Missing or undecodable files yield `None`.
    async fn read_record(&self, path: &Path) -> Result<Option<SessionRecord>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<SessionRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable session record");
                Ok(None)
            }
        }
    }

    /// Remove a temp file if no save can still be writing it.
    async fn remove_stale_temp(path: &Path) -> Result<()> {
        let modified = match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age >= STALE_TEMP_AGE {
            Self::remove_file(path).await?;
            debug!(path = %path.display(), "removed stale temp file");
        }
        Ok(())
    }

    async fn remove_file(path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self, id: &SessionId) -> Result<LoadOutcome> {
        let path = self.path_for(id);
        let record = match self.read_record(&path).await? {
            Some(record) if record.id == *id => record,
            _ => return Ok(LoadOutcome::NotFound),
        };

        if record.is_expired() {
            debug!(session_id = %id, "purging expired session file");
            Self::remove_file(&path).await?;
            return Ok(LoadOutcome::NotFound);
        }
        Ok(LoadOutcome::Found(record))
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        let temp = self.temp_path_for(&record.id);

        if let Err(e) = fs::write(&temp, &bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, self.path_for(&record.id)).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        Self::remove_file(&self.path_for(id)).await
    }

    async fn sweep(&self) -> Result<usize> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                Self::remove_stale_temp(&entry.path()).await?;
                continue;
            }
            let Ok(id) = name.parse::<SessionId>() else {
                continue;
            };

            let path = entry.path();
            let expired = match self.read_record(&path).await? {
                Some(record) => record.is_expired(),
                None => true,
            };
            if expired {
                Self::remove_file(&path).await?;
                debug!(session_id = %id, "swept session file");
                removed += 1;
            }
        }

        Ok(removed)
    }
}
