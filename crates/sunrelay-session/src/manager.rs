//! The session manager: owns the relay's single upstream session.
//!
//! Every request that touches the upstream goes through
//! [`SessionManager::with_session`]. The manager is responsible for:
//! - Logging in lazily, on the first request that needs a session
//! - Sharing that one session between all concurrent requests
//! - Noticing when the upstream has expired it
//! - Logging in again and retrying the failed operation, once
//!
//! # Concurrency note
//!
//! The current session lives behind a `tokio::sync::Mutex`. The lock is
//! held for *transitions* only (issuing, replacing, or clearing the
//! session), including across the login round-trip. That is what makes
//! concurrent first requests share one login instead of racing to create
//! several. Once an operation has its `Arc<Session>` it runs without the
//! lock, so slow upstream calls never queue behind each other.
//!
//! Status reads ([`is_authenticated`](SessionManager::is_authenticated),
//! [`current_generation`](SessionManager::current_generation)) never take
//! the lock. They read an atomic mirror that is written under it, so a
//! health check answers immediately even while a login is hanging.

use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sunrelay_config::ConfigSource;
use tokio::sync::Mutex;

use crate::{Credentials, Session, SessionError, Upstream, UpstreamError, is_auth_error};

/// A session handle as handed to operations.
pub type SessionHandle<U> = Arc<Session<<U as Upstream>::Connection>>;

/// Owns the upstream session and the retry-once protocol.
///
/// ## Lifecycle
///
/// ```text
///                 authenticate() ok
/// [Unauthenticated] ───────────────→ [Authenticated]
///        ↑                                 │
///        │  reset_session()                │
///        │  login failure                  │
///        │  auth failure in with_session ──┘ (followed at once by
///        └──────────────────────────────────  one re-authenticate)
/// ```
///
/// There is no terminal state; the manager cycles for the life of the
/// process.
pub struct SessionManager<U: Upstream> {
    upstream: U,

    /// Where credentials come from. Read on every login.
    config: Arc<dyn ConfigSource>,

    /// The current session. `Some` means authenticated.
    current: Mutex<Option<SessionHandle<U>>>,

    /// Source of session generations. The first login gets 1.
    generations: AtomicU64,

    /// Generation of the session in `current`, or 0 when there is none.
    /// Only written while `current` is locked.
    live_generation: AtomicU64,
}

impl<U: Upstream> SessionManager<U> {
    /// Creates a manager with no session. Nothing touches the network
    /// until the first [`get_session`](Self::get_session).
    pub fn new(upstream: U, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            upstream,
            config,
            current: Mutex::new(None),
            generations: AtomicU64::new(0),
            live_generation: AtomicU64::new(0),
        }
    }

    /// The upstream client, for operations that need more than the
    /// connection (e.g. [`Upstream::invoke`]).
    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Logs in and stores a brand-new session.
    ///
    /// Any existing session is torn down first (best-effort logout). On
    /// failure the manager is left unauthenticated; the old session is
    /// not brought back.
    ///
    /// # Errors
    /// - [`SessionError::Configuration`]: credentials not configured
    ///   (the existing session, if any, is left untouched)
    /// - [`SessionError::Authentication`]: the upstream rejected the login
    pub async fn authenticate(&self) -> Result<SessionHandle<U>, SessionError> {
        let mut current = self.current.lock().await;
        self.authenticate_locked(&mut current).await
    }

    /// Returns the current session, logging in first if there is none.
    ///
    /// The fast path does no network I/O.
    pub async fn get_session(&self) -> Result<SessionHandle<U>, SessionError> {
        let mut current = self.current.lock().await;

        if let Some(session) = current.as_ref().filter(|s| s.is_valid()) {
            return Ok(Arc::clone(session));
        }

        self.authenticate_locked(&mut current).await
    }

    /// Drops the current session (best-effort logout) without logging in
    /// again. The next [`get_session`](Self::get_session) will.
    ///
    /// Never fails. Safe to call when there is no session.
    pub async fn reset_session(&self) {
        let mut current = self.current.lock().await;
        if let Some(old) = current.take() {
            tracing::info!(generation = old.generation(), "upstream session reset");
            self.teardown(old).await;
        }
    }

    /// Runs `operation` with a live session, re-authenticating once if
    /// the upstream says the session is no longer valid.
    ///
    /// 1. Get a session (logging in if needed).
    /// 2. Run `operation(session)`. Success is returned as-is.
    /// 3. A failure that [`is_auth_error`] does not recognise is returned
    ///    at once, with no retry.
    /// 4. An auth failure resets the session, logs in again, and runs
    ///    `operation(fresh)` one more time. Whatever that second attempt
    ///    returns is final, even another auth failure.
    ///
    /// `FnMut` because the closure may be called twice.
    ///
    /// # Concurrent expiry
    ///
    /// The retry counts per call, not per session. When several callers
    /// fail on the same expired session, each one resets and logs in again
    /// in turn, and each reset logs out the session the previous caller's
    /// retry is running on. Under an upstream that revokes tokens on
    /// logout, most of those retries then fail with an auth error of their
    /// own. Callers see that as an ordinary upstream failure.
    pub async fn with_session<T, F, Fut>(&self, mut operation: F) -> Result<T, SessionError>
    where
        F: FnMut(SessionHandle<U>) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let session = self.get_session().await?;
        let generation = session.generation();

        let failure = match operation(session).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        if !is_auth_error(&failure as &(dyn Error + 'static)) {
            return Err(SessionError::Upstream(failure));
        }

        tracing::warn!(
            generation,
            error = %failure,
            "upstream rejected session, re-authenticating"
        );

        let fresh = self.refresh().await?;
        operation(fresh).await.map_err(SessionError::Upstream)
    }

    /// Returns `true` if a valid session is currently held.
    ///
    /// Does not wait for a login or logout in progress; during one it
    /// reports `false`.
    pub fn is_authenticated(&self) -> bool {
        self.current_generation().is_some()
    }

    /// Generation of the current session, if any. Lock-free, like
    /// [`is_authenticated`](Self::is_authenticated).
    pub fn current_generation(&self) -> Option<u64> {
        match self.live_generation.load(Ordering::Acquire) {
            0 => None,
            generation => Some(generation),
        }
    }

    // -- Internals ----------------------------------------------------------

    /// Reset followed by authenticate, under a single lock acquisition so
    /// no other caller can slip a login in between the two.
    async fn refresh(&self) -> Result<SessionHandle<U>, SessionError> {
        let mut current = self.current.lock().await;
        if let Some(old) = current.take() {
            tracing::info!(generation = old.generation(), "upstream session reset");
            self.teardown(old).await;
        }
        self.authenticate_locked(&mut current).await
    }

    /// The body of [`authenticate`](Self::authenticate). The caller must
    /// hold the `current` lock and pass its guard in.
    async fn authenticate_locked(
        &self,
        current: &mut Option<SessionHandle<U>>,
    ) -> Result<SessionHandle<U>, SessionError> {
        let credentials = Credentials::from_source(self.config.as_ref())?;

        if let Some(old) = current.take() {
            self.teardown(old).await;
        }

        let connection = match self.upstream.login(&credentials).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(
                    principal = %credentials.principal(),
                    error = %e,
                    "upstream login failed"
                );
                return Err(SessionError::Authentication(e));
            }
        };

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Arc::new(Session::new(generation, connection));
        *current = Some(Arc::clone(&session));
        self.live_generation.store(generation, Ordering::Release);

        tracing::info!(
            generation,
            principal = %credentials.principal(),
            "upstream session established"
        );
        Ok(session)
    }

    /// Marks `session` invalid and logs it out, ignoring logout failures.
    async fn teardown(&self, session: SessionHandle<U>) {
        session.invalidate();
        self.live_generation.store(0, Ordering::Release);
        tracing::debug!(
            generation = session.generation(),
            age_secs = session.established_at().elapsed().as_secs(),
            "logging out upstream session"
        );
        if let Err(e) = self.upstream.logout(session.connection()).await {
            tracing::debug!(
                generation = session.generation(),
                error = %e,
                "ignoring upstream logout failure"
            );
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
