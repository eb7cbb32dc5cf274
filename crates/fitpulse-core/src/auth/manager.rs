//! Session state machine.
//!
//! `SessionManager` is the single owner of the session token. Consumers read
//! snapshots and register observers; they never mutate the session directly.
//!
//! ```text
//!   Unauthenticated --restore--> Restoring --> Authenticated | Unauthenticated
//!   Unauthenticated --sign_in--> Authenticating --> Authenticated | Error
//!   Error --acknowledge_error--> Unauthenticated
//!   any --sign_out--> Unauthenticated
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::AuthClient;
use crate::config::{Config, StoreBackend};
use crate::store::{FileStore, KeyValueStore, KeyringStore};

use super::publish::{Publisher, Subscription};
use super::session::{AuthState, SessionSnapshot};
use super::token::generate_local_token;
use super::AuthError;

/// Store key holding the session token
pub const SESSION_TOKEN_KEY: &str = "sessionToken";

/// Which token `sign_up` persists after the account is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpTokenPolicy {
    /// A locally generated random token, unrelated to the server identity
    #[default]
    Generated,
    /// The email echoed back by the server, matching what `sign_in` stores
    ServerEmail,
}

pub struct SessionManager {
    client: AuthClient,
    store: Arc<dyn KeyValueStore>,
    sign_up_policy: SignUpTokenPolicy,
    state_tx: watch::Sender<SessionSnapshot>,
    publisher: Publisher,
    // Bumped by sign_out so results of requests started earlier are discarded
    generation: AtomicU64,
    // Held across every store access for the session token
    token_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(client: AuthClient, store: Arc<dyn KeyValueStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot::unauthenticated());
        Self {
            client,
            store,
            sign_up_policy: SignUpTokenPolicy::default(),
            state_tx,
            publisher: Publisher::default(),
            generation: AtomicU64::new(0),
            token_lock: Mutex::new(()),
        }
    }

    pub fn with_sign_up_policy(mut self, policy: SignUpTokenPolicy) -> Self {
        self.sign_up_policy = policy;
        self
    }

    /// Build a manager wired to the client and store named by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = AuthClient::new(config.api_base_url.clone(), config.request_timeout())
            .context("Failed to build auth client")?;

        let store: Arc<dyn KeyValueStore> = match config.store {
            StoreBackend::File => Arc::new(FileStore::new(config.data_dir()?)),
            StoreBackend::Keyring => Arc::new(KeyringStore::default()),
        };

        debug!(base_url = %config.api_base_url, store = ?config.store, "Session manager configured");
        Ok(Self::new(client, store).with_sign_up_policy(config.sign_up_token))
    }

    // =========================================================================
    // Reading state
    // =========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().state().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state_tx.borrow().token().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_tx.borrow().is_authenticated()
    }

    /// Latest-value channel for async consumers
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    /// Register an observer called synchronously after every transition
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        self.publisher.subscribe(observer)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resume a previously persisted session. Returns whether one was found.
    ///
    /// Read failures are logged and leave the session unauthenticated. Does
    /// nothing and returns false while another operation is running or a
    /// session is already established.
    pub async fn restore_session(&self) -> bool {
        let mut generation = 0;
        let started = self.transition_if(SessionSnapshot::restoring(), |current| {
            if current.state().is_busy() || current.is_authenticated() {
                return false;
            }
            generation = self.generation.load(Ordering::SeqCst);
            true
        });
        if !started {
            warn!(state = ?self.state(), "Session restore skipped");
            return false;
        }

        let stored = {
            let _token = self.token_lock.lock().await;
            self.store.get(SESSION_TOKEN_KEY).await
        };
        let next = match stored {
            Ok(Some(token)) if !token.is_empty() => {
                info!("Restored persisted session");
                SessionSnapshot::authenticated(token)
            }
            Ok(_) => {
                debug!("No persisted session");
                SessionSnapshot::unauthenticated()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                SessionSnapshot::unauthenticated()
            }
        };

        let restored = next.is_authenticated();
        let committed = self.transition_if(next, |current| {
            *current.state() == AuthState::Restoring
                && self.generation.load(Ordering::SeqCst) == generation
        });
        committed && restored
    }

    /// Authenticate against the auth service and persist the returned token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        let generation = self.begin_authenticating(email, password)?;
        info!(email, "Signing in");

        let result = match self.client.sign_in(email, password).await {
            Ok(token) => self.persist_token(generation, &token).await.map(|()| token),
            Err(e) => Err(AuthError::from(e)),
        };

        match result {
            Ok(token) => {
                let snapshot = SessionSnapshot::authenticated(token);
                if self.finish(generation, snapshot.clone()) {
                    info!(email, "Signed in");
                    Ok(snapshot)
                } else {
                    Err(AuthError::Superseded)
                }
            }
            Err(e) => Err(self.fail(generation, e)),
        }
    }

    /// Create an account. On success a token is persisted according to the
    /// sign-up policy, but the session stays unauthenticated: the caller is
    /// expected to follow up with `sign_in`.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let generation = self.begin_authenticating(email, password)?;
        info!(email, policy = ?self.sign_up_policy, "Signing up");

        let result = match self.client.sign_up(email, password).await {
            Ok(response) => {
                let token = match self.sign_up_policy {
                    SignUpTokenPolicy::Generated => Ok(generate_local_token()),
                    SignUpTokenPolicy::ServerEmail => response
                        .email
                        .filter(|e| !e.trim().is_empty())
                        .ok_or_else(|| {
                            AuthError::MalformedResponse("sign-up response is missing the email".to_string())
                        }),
                };
                match token {
                    Ok(token) => self.persist_token(generation, &token).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(AuthError::from(e)),
        };

        match result {
            Ok(()) => {
                if self.finish(generation, SessionSnapshot::unauthenticated()) {
                    info!(email, "Account created");
                    Ok(())
                } else {
                    Err(AuthError::Superseded)
                }
            }
            Err(e) => Err(self.fail(generation, e)),
        }
    }

    /// Clear the session. Always succeeds; a failure to remove the persisted
    /// token is logged and the in-memory session is cleared regardless.
    ///
    /// An in-flight sign-in or sign-up is superseded: it writes nothing to the
    /// store and its caller gets `AuthError::Superseded`.
    pub async fn sign_out(&self) {
        let _token = self.token_lock.lock().await;

        self.transition_if(SessionSnapshot::unauthenticated(), |_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            true
        });

        if let Err(e) = self.store.remove(SESSION_TOKEN_KEY).await {
            warn!(error = %e, "Failed to remove persisted session token");
        }
        info!("Signed out");
    }

    /// Move from `Error` back to `Unauthenticated`. Returns false in any other state.
    pub fn acknowledge_error(&self) -> bool {
        self.transition_if(SessionSnapshot::unauthenticated(), |current| {
            matches!(current.state(), AuthState::Error { .. })
        })
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Validate credentials and claim the state machine.
    /// Returns the generation the operation belongs to.
    fn begin_authenticating(&self, email: &str, password: &str) -> Result<u64, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let mut generation = 0;
        let started = self.transition_if(SessionSnapshot::authenticating(), |current| {
            if current.state().is_busy() {
                return false;
            }
            generation = self.generation.load(Ordering::SeqCst);
            true
        });

        if started {
            Ok(generation)
        } else {
            warn!(state = ?self.state(), "Rejected overlapping authentication request");
            Err(AuthError::OperationInProgress)
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Write the token unless a sign-out has happened since `generation` was
    /// taken. The check and the write happen under `token_lock`, so a sign-out
    /// either prevents the write or removes it afterwards.
    async fn persist_token(&self, generation: u64, token: &str) -> Result<(), AuthError> {
        let _token = self.token_lock.lock().await;
        if !self.is_current(generation) {
            return Err(AuthError::Superseded);
        }
        self.store.set(SESSION_TOKEN_KEY, token).await?;
        Ok(())
    }

    /// Commit the outcome of an authentication request if it is still the
    /// one that owns the state machine.
    fn finish(&self, generation: u64, next: SessionSnapshot) -> bool {
        self.transition_if(next, |current| {
            *current.state() == AuthState::Authenticating
                && self.generation.load(Ordering::SeqCst) == generation
        })
    }

    fn fail(&self, generation: u64, error: AuthError) -> AuthError {
        if !self.is_current(generation) {
            debug!(error = %error, "Discarding result of superseded request");
            return AuthError::Superseded;
        }
        warn!(error = %error, "Authentication failed");
        if error != AuthError::Superseded {
            self.finish(generation, SessionSnapshot::failed(error.user_message()));
        }
        error
    }

    /// Commit `next` if `allow` accepts the current snapshot, then notify
    /// every observer before returning. Observers see transitions in commit
    /// order even when they come from different threads.
    fn transition_if<F>(&self, next: SessionSnapshot, allow: F) -> bool
    where
        F: FnOnce(&SessionSnapshot) -> bool,
    {
        let mut seq = None;
        self.state_tx.send_if_modified(|current| {
            if !allow(current) {
                return false;
            }
            debug!(from = ?current.state(), to = ?next.state(), "Session transition");
            *current = next.clone();
            seq = Some(self.publisher.enqueue(next));
            true
        });

        match seq {
            Some(seq) => {
                self.publisher.deliver(seq);
                true
            }
            None => false,
        }
    }
}
