//! Error types for the protocol layer.

/// Errors raised while interpreting protocol values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// An operation name in a request path is not well formed.
    ///
    /// Names must be 1 to 64 ASCII letters, digits, `_`, `-`, or `.`.
    #[error("invalid operation name: {0:?}")]
    InvalidOperationName(String),
}
