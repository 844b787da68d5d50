//! Error types for the configuration layer.

/// Errors raised while reading configuration.
///
/// Variants carry the key name only. Values are never included, since
/// most of the keys this crate reads hold secrets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent (or set to the empty string).
    #[error("{0} is not configured")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed.
    ///
    /// The second field describes what was expected, e.g.
    /// `"a port number"`.
    #[error("{0} is invalid: expected {1}")]
    Invalid(&'static str, &'static str),
}
