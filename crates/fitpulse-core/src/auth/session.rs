use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Where the session state machine currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AuthState {
    Unauthenticated,
    /// Reading a persisted token at start-up
    Restoring,
    /// A sign-in or sign-up request is in flight
    Authenticating,
    Authenticated,
    /// The last sign-in or sign-up failed; cleared by acknowledging it
    Error { message: String },
}

impl AuthState {
    /// True while an operation owns the state machine
    pub fn is_busy(&self) -> bool {
        matches!(self, AuthState::Restoring | AuthState::Authenticating)
    }
}

/// Immutable view of the session published to consumers.
///
/// Snapshots can only be built through the constructors below, so a token is
/// present exactly when the state is `Authenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionSnapshot {
    state: AuthState,
    token: Option<String>,
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    authenticated_at: Option<DateTime<Utc>>,
    is_authenticated: bool,
}

impl SessionSnapshot {
    fn without_token(state: AuthState) -> Self {
        Self {
            state,
            token: None,
            authenticated_at: None,
            is_authenticated: false,
        }
    }

    pub fn unauthenticated() -> Self {
        Self::without_token(AuthState::Unauthenticated)
    }

    pub fn restoring() -> Self {
        Self::without_token(AuthState::Restoring)
    }

    pub fn authenticating() -> Self {
        Self::without_token(AuthState::Authenticating)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::without_token(AuthState::Error {
            message: message.into(),
        })
    }

    pub fn authenticated(token: impl Into<String>) -> Self {
        Self {
            state: AuthState::Authenticated,
            token: Some(token.into()),
            authenticated_at: Some(Utc::now()),
            is_authenticated: true,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// The failure message while in the `Error` state
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            AuthState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// How long the current session has been established
    pub fn session_age(&self) -> Option<Duration> {
        self.authenticated_at.map(|at| Utc::now() - at)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::unauthenticated()
    }
}
