//! Session controller - sole owner of the portal session state.
//!
//! Both the watcher path (login redirect seen on the feed) and the periodic
//! self-check end up here. Every login runs under one async mutex, so a
//! self-check that fires mid-login waits and then finds the session healthy
//! instead of starting a second login.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::common::{RelayError, RelayResult, SessionState};
use crate::kernel::BaseAuthenticator;

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct SessionController {
    authenticator: Arc<dyn BaseAuthenticator>,
    credentials: Credentials,
    feed_url: String,
    login_timeout: Duration,
    login_guard: Mutex<()>,
    state: watch::Sender<SessionState>,
    /// Bumped after every successful login
    generation: watch::Sender<u64>,
    login_attempts: AtomicU64,
}

impl SessionController {
    pub fn new(
        authenticator: Arc<dyn BaseAuthenticator>,
        credentials: Credentials,
        feed_url: impl Into<String>,
        login_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        let (generation, _) = watch::channel(0);

        Self {
            authenticator,
            credentials,
            feed_url: feed_url.into(),
            login_timeout,
            login_guard: Mutex::new(()),
            state,
            generation,
            login_attempts: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Notified after every successful login, whoever performed it.
    pub fn subscribe_generation(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn login_attempts(&self) -> u64 {
        self.login_attempts.load(Ordering::SeqCst)
    }

    /// Make sure the session is authenticated and on the feed page.
    ///
    /// No-op when already authenticated and the surface does not show the
    /// login form.
    pub async fn ensure_authenticated(&self) -> RelayResult<()> {
        let _guard = self.login_guard.lock().await;

        if self.state() == SessionState::Authenticated {
            match self.authenticator.on_login_page().await {
                Ok(false) => return Ok(()),
                Ok(true) => warn!("Login page detected; session expired"),
                Err(e) => warn!(error = %e, "Could not inspect surface; re-authenticating"),
            }
            self.set_state(SessionState::Unauthenticated);
        }

        self.login_locked().await
    }

    /// Watcher path: the feed was replaced by the login form.
    ///
    /// Skips the login when another caller re-established the session while
    /// this one was waiting for the guard.
    pub async fn session_invalidated(&self) -> RelayResult<()> {
        let observed = self.generation();
        let _guard = self.login_guard.lock().await;

        if self.generation() != observed && self.state() == SessionState::Authenticated {
            debug!("Session already restored by a concurrent login");
            return Ok(());
        }

        info!(previous = %self.state(), "Session invalidated");
        self.set_state(SessionState::Unauthenticated);
        self.login_locked().await
    }

    async fn login_locked(&self) -> RelayResult<()> {
        let attempt = self.login_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, email = %self.credentials.email, "Logging in to portal");

        let outcome = match tokio::time::timeout(self.login_timeout, self.login_and_navigate()).await
        {
            Ok(result) => result,
            Err(_) => Err(RelayError::AuthenticationFailed(format!(
                "login did not complete within {:?}",
                self.login_timeout
            ))),
        };

        match outcome {
            Ok(()) => {
                self.set_state(SessionState::Authenticated);
                self.generation.send_modify(|g| *g += 1);
                info!(generation = self.generation(), "Session established on feed page");
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Unauthenticated);
                let e = if matches!(e, RelayError::AuthenticationFailed(_)) {
                    e
                } else {
                    RelayError::AuthenticationFailed(e.to_string())
                };
                error!(error = %e, attempt, "Login failed");
                Err(e)
            }
        }
    }

    async fn login_and_navigate(&self) -> RelayResult<()> {
        self.authenticator
            .login(&self.credentials.email, &self.credentials.password)
            .await?;
        self.authenticator.navigate_to(&self.feed_url).await?;

        if self.authenticator.on_login_page().await? {
            return Err(RelayError::AuthenticationFailed(
                "feed page still redirects to login".to_string(),
            ));
        }
        Ok(())
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(%previous, %next, "Session state changed");
        }
    }
}
