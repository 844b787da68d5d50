//! Session and credential types.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use sunrelay_config::{ConfigError, ConfigSource, keys};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// The upstream account the relay logs in as.
///
/// Read fresh from configuration on every login, never cached here.
/// `Debug` redacts the secret so credentials can appear in traces safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    principal: String,
    secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    /// Reads the principal and secret from `source`.
    ///
    /// # Errors
    /// [`ConfigError::Missing`] naming the first absent key.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        Ok(Self {
            principal: source.require(keys::UPSTREAM_PRINCIPAL)?,
            secret: source.require(keys::UPSTREAM_SECRET)?,
        })
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A live, authenticated upstream connection.
///
/// Sessions are created by [`SessionManager`](crate::SessionManager) and
/// handed to operations as `Arc<Session<C>>`. They are never mutated after
/// creation except for the validity flag: re-authentication produces a
/// brand-new session (with a higher [`generation`](Self::generation))
/// rather than patching the old one.
///
/// `Deref` to the connection lets operations call client methods directly:
/// `session.get_tasks()` instead of `session.connection().get_tasks()`.
pub struct Session<C> {
    generation: u64,
    connection: C,
    valid: AtomicBool,
    established_at: Instant,
}

impl<C> Session<C> {
    pub(crate) fn new(generation: u64, connection: C) -> Self {
        Self {
            generation,
            connection,
            valid: AtomicBool::new(true),
            established_at: Instant::now(),
        }
    }

    /// Monotonic counter, starting at 1, bumped on every successful login.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Returns `false` once the manager has torn this session down.
    ///
    /// An operation that is still holding a torn-down session can finish,
    /// but the upstream may reject it.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// When the login that produced this session completed.
    pub fn established_at(&self) -> Instant {
        self.established_at
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl<C> Deref for Session<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The connection is opaque (and may hold tokens), so leave it out.
        f.debug_struct("Session")
            .field("generation", &self.generation)
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}
