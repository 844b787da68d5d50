//! Inbound authorization for Sunrelay.
//!
//! Callers of the relay prove who they are with a single shared API key,
//! sent in the `Authorization` header either bare or as `Bearer <key>`.
//! [`ApiKeyGate`] checks that header against the configured key before a
//! request reaches any route logic.
//!
//! This crate knows nothing about HTTP; it only sees the header value.
//! That keeps it trivially testable and lets the server crate decide how
//! rejections are rendered.

mod error;

use std::sync::Arc;

use sunrelay_config::{ConfigSource, keys};

pub use error::GateError;

/// Prefix stripped from the header before comparison. Case-sensitive.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Checks inbound credentials against the configured API key.
///
/// The key is re-read from the config source on every check, so it can
/// be rotated without restarting the relay.
#[derive(Clone)]
pub struct ApiKeyGate {
    config: Arc<dyn ConfigSource>,
}

impl ApiKeyGate {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self { config }
    }

    /// Validates an `Authorization` header value.
    ///
    /// # Errors
    /// Checked in this order:
    /// - [`GateError::NotConfigured`]: no key configured, whatever the header
    /// - [`GateError::MissingCredential`]: `header` is `None`
    /// - [`GateError::InvalidCredential`]: token does not match exactly
    pub fn check(&self, header: Option<&str>) -> Result<(), GateError> {
        let Some(expected) = self.config.get(keys::API_KEY) else {
            tracing::error!("{} is not set; refusing all requests", keys::API_KEY);
            return Err(GateError::NotConfigured);
        };

        let header = header.ok_or(GateError::MissingCredential)?;
        let token = header.strip_prefix(BEARER_PREFIX).unwrap_or(header);

        // Plain comparison: key length and shape are not treated as
        // sensitive in this deployment model.
        if token != expected {
            tracing::debug!("rejected request with invalid API key");
            return Err(GateError::InvalidCredential);
        }

        Ok(())
    }
}
