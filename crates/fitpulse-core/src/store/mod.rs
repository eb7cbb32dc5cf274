//! Persistent key-value storage for the session token.
//!
//! This module provides:
//! - `KeyValueStore`: the async seam the session manager persists through
//! - `FileStore`: a JSON document in the application data directory
//! - `KeyringStore`: secrets kept in the OS keychain
//! - `MemoryStore`: process-local storage for tests and ephemeral sessions

pub mod file;
pub mod keychain;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store data: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// A scoped store for small string values that survive process restarts.
///
/// Implementations release any handle they open before returning.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
