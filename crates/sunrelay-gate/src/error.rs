//! Error types for the inbound gate.

/// Why an inbound request was refused.
///
/// [`NotConfigured`](Self::NotConfigured) is the relay's fault; the other
/// two are the caller's. The HTTP layer maps them to different statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// No API key is configured, so nobody can be let in.
    #[error("server is not properly configured")]
    NotConfigured,

    /// The caller sent no `Authorization` header.
    #[error("missing Authorization header")]
    MissingCredential,

    /// The caller's token does not match the configured key.
    #[error("invalid API key")]
    InvalidCredential,
}
