//! Error types for the session layer.

use sunrelay_config::ConfigError;

/// A failure reported by the upstream service.
///
/// Upstream clients produce these from `login`, `logout`, and every
/// proxied operation. The variants give the error classifier something
/// structured to look at, while [`Other`](Self::Other) keeps the door open
/// for arbitrary error types that only carry a message.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream service rejected our credentials or session.
    ///
    /// This is the dedicated auth kind: it is always classified as an
    /// auth error, whatever its message says.
    #[error("upstream rejected authentication: {0}")]
    Auth(String),

    /// The upstream API answered with an error status.
    ///
    /// Statuses 401 and 403 count as auth errors (see [`is_auth`](Self::is_auth)).
    #[error("upstream request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The caller asked for an operation the upstream client does not have.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Any other failure, kept intact so its message and source chain
    /// remain available to the classifier and to logs.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl UpstreamError {
    /// Wraps an arbitrary error (or a plain message) as [`Other`](Self::Other).
    pub fn other(
        err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::Other(err.into())
    }

    /// Returns `true` if this error carries a structured auth marker.
    ///
    /// Only looks at the error kind. Message text is the classifier's job
    /// (see [`is_auth_error`](crate::is_auth_error)).
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::Api { status, .. } => matches!(status, 401 | 403),
            Self::UnknownOperation(_) => false,
            Self::Other(inner) => inner
                .downcast_ref::<UpstreamError>()
                .is_some_and(UpstreamError::is_auth),
        }
    }
}

/// Errors returned by [`SessionManager`](crate::SessionManager).
///
/// The wrapped failures are carried intact: `Display` is transparent, so
/// callers see exactly what the upstream (or the config source) said.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Upstream credentials are missing from configuration.
    ///
    /// Never retried. The relay surfaces this as a server-side fault.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The upstream service refused to log us in.
    ///
    /// No session is stored after this error; the next call starts again
    /// from the unauthenticated state.
    #[error(transparent)]
    Authentication(UpstreamError),

    /// A proxied operation failed.
    ///
    /// Either the failure was not auth-related (returned on the first
    /// attempt), or it was and this is the failure of the single retry.
    #[error(transparent)]
    Upstream(UpstreamError),
}
