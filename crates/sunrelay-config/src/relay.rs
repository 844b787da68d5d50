//! Listener settings for the relay server.

use crate::{keys, ConfigError, ConfigSource};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Host used when `HOST` is not set.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Settings read once at startup.
///
/// Unlike credentials and the inbound API key, the listen address cannot
/// change without a restart, so it is resolved a single time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Interface to listen on.
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,
}

impl RelayConfig {
    /// Resolves listener settings from `source`, falling back to defaults.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if `PORT` is set but is not a valid port.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let host = source
            .get(keys::HOST)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match source.get(keys::PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(keys::PORT, "a port number"))?,
            None => DEFAULT_PORT,
        };

        tracing::debug!(%host, port, "relay listener configured");
        Ok(Self { host, port })
    }

    /// Returns the `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}
