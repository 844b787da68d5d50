//! Configuration for Sunrelay.
//!
//! The relay needs very little configuration, but it needs it at awkward
//! moments: upstream credentials are re-read on every login, and the
//! inbound API key is re-read on every request. This crate provides:
//!
//! - **Sources** ([`ConfigSource`], [`EnvConfig`], [`StaticConfig`]):
//!   where values come from.
//! - **Keys** ([`keys`]): the names of the settings the relay reads.
//! - **Listener settings** ([`RelayConfig`]): resolved once at startup.
//! - **Errors** ([`ConfigError`]): missing or malformed settings.

mod error;
mod relay;
mod source;

pub use error::ConfigError;
pub use relay::{DEFAULT_HOST, DEFAULT_PORT, RelayConfig};
pub use source::{ConfigSource, EnvConfig, StaticConfig};

/// Names of the settings the relay reads.
pub mod keys {
    /// Upstream account principal (login name).
    pub const UPSTREAM_PRINCIPAL: &str = "SUNSAMA_EMAIL";

    /// Upstream account secret.
    pub const UPSTREAM_SECRET: &str = "SUNSAMA_PASSWORD";

    /// Secret that inbound callers must present.
    pub const API_KEY: &str = "API_KEY";

    /// Listen port.
    pub const PORT: &str = "PORT";

    /// Listen host.
    pub const HOST: &str = "HOST";
}
