//! Where settings come from.
//!
//! Everything in Sunrelay reads configuration through the [`ConfigSource`]
//! trait rather than calling `std::env::var` directly. Production code
//! uses [`EnvConfig`]; tests (and embedders who load settings from
//! somewhere else) use [`StaticConfig`].
//!
//! Sources are consulted on every read. Nothing here caches values, so a
//! rotated secret takes effect on the very next request.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ConfigError;

/// A read-only view over string-valued settings.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because a single source is shared by every
/// request handler for the lifetime of the server.
pub trait ConfigSource: Send + Sync + 'static {
    /// Returns the value for `key`, or `None` if it is not set.
    ///
    /// Implementations must treat an empty value as unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Like [`get`](Self::get), but a missing value is an error.
    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

// ---------------------------------------------------------------------------
// EnvConfig
// ---------------------------------------------------------------------------

/// Reads settings from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        // `var` fails for both "not present" and "not unicode". Either way
        // the setting is unusable, so both collapse to `None`.
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// StaticConfig
// ---------------------------------------------------------------------------

/// An in-memory settings map that can be changed at runtime.
///
/// Interior mutability (`RwLock`) lets a test hold an `Arc<StaticConfig>`,
/// hand a clone to the server, and then rotate a value while the server
/// is running.
#[derive(Debug, Default)]
pub struct StaticConfig {
    values: RwLock<HashMap<String, String>>,
}

impl StaticConfig {
    /// Creates an empty source. Every key reads as unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for one-line test setup.
    pub fn with(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Sets (or replaces) a value.
    pub fn set(&self, key: &str, value: &str) {
        let mut values = match self.values.write() {
            Ok(guard) => guard,
            // A writer panicked mid-update. The map itself is still a
            // valid HashMap, so keep using it.
            Err(poisoned) => poisoned.into_inner(),
        };
        values.insert(key.to_string(), value.to_string());
    }

    /// Removes a value. Later reads of `key` return `None`.
    pub fn remove(&self, key: &str) {
        let mut values = match self.values.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.remove(key);
    }
}

impl ConfigSource for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        let values = match self.values.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.get(key).filter(|v| !v.is_empty()).cloned()
    }
}
