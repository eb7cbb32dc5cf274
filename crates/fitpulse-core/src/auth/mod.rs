//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: sign-in/sign-up/sign-out, restoration at start-up, and
//!   publication of every state change to subscribers
//! - `SessionSnapshot`: the immutable view of the session handed to consumers
//! - `AuthError`: the failure taxonomy surfaced to callers
//!
//! The session token lives in a `KeyValueStore` under `"sessionToken"` and
//! never expires on its own; it is cleared only by signing out.

pub mod error;
pub mod manager;
mod publish;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use manager::{SessionManager, SignUpTokenPolicy, SESSION_TOKEN_KEY};
pub use publish::Subscription;
pub use session::{AuthState, SessionSnapshot};
