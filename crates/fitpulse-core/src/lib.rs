//! Core library for fitpulse.
//!
//! Provides the pieces a fitness client needs to keep a user signed in:
//! - `api`: HTTP client for the remote auth service
//! - `auth`: the `SessionManager` state machine and its published snapshot
//! - `store`: persistent key-value backends for the session token
//! - `config`: on-disk application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod store;

pub use api::{ApiError, AuthClient};
pub use auth::{AuthError, AuthState, SessionManager, SessionSnapshot, SignUpTokenPolicy, Subscription};
pub use config::{Config, StoreBackend};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};
