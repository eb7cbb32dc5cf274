use async_trait::async_trait;
use keyring::Entry;

use super::{KeyValueStore, StoreError};

/// Keychain service name used when none is given
pub const DEFAULT_SERVICE_NAME: &str = "fitpulse";

/// Key-value store backed by the OS keychain.
/// Each key is stored as the password of an entry `(service, key)`.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Run a keychain call on the blocking pool; platform keychains answer
    /// over IPC and may stall the calling thread.
    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Entry) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || op(Entry::new(&service, &key)?))
            .await
            .map_err(|e| StoreError::Backend(format!("keychain task failed: {}", e)))?
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.with_entry(key, move |entry| Ok(entry.set_password(&value)?))
            .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_entry_reads_as_none() {
        // Runs against whatever credential store the platform offers; skip
        // quietly where none is available (headless CI).
        let store = KeyringStore::new("fitpulse-test-missing-entry");
        match store.get("never-written").await {
            Ok(value) => assert_eq!(value, None),
            Err(StoreError::Keychain(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remove_missing_entry_is_ok() {
        let store = KeyringStore::new("fitpulse-test-missing-entry");
        match store.remove("never-written").await {
            Ok(()) | Err(StoreError::Keychain(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
