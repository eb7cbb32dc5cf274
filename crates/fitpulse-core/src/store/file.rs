use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{KeyValueStore, StoreError};

/// Store file name in the data directory
const STORE_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    stored_at: DateTime<Utc>,
}

/// Key-value store backed by a single JSON document on disk.
///
/// Each operation opens, reads or writes, and closes the file before
/// returning. Writes go to a temporary sibling first and are renamed into
/// place so a crash never leaves a half-written document.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store `session.json` inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(STORE_FILE))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, StoredValue>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_all(&self, entries: &BTreeMap<String, StoredValue>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.read_all().await?;
        Ok(entries.get(key).map(|stored| stored.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                stored_at: Utc::now(),
            },
        );
        self.write_all(&entries).await?;
        debug!(key, path = %self.path.display(), "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_all(&entries).await?;
        }
        debug!(key, path = %self.path.display(), "Removed value");
        Ok(())
    }
}
