//! # Sunrelay
//!
//! An authenticated HTTP relay in front of a single upstream session.
//!
//! The relay logs in to the upstream service once, shares that session
//! between every inbound request, and transparently logs in again (and
//! retries once) when the upstream says the session has expired. Callers
//! authenticate to the relay with a shared API key.
//!
//! You implement [`Upstream`](sunrelay_session::Upstream) around your
//! upstream client; the relay handles the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sunrelay::prelude::*;
//!
//! // Implement Upstream for your client, then:
//! // let server = RelayServerBuilder::new()
//! //     .bind("0.0.0.0:3000")
//! //     .build(MyUpstream::new())
//! //     .await?;
//! // server.run().await
//! ```

mod error;
mod gate;
mod handler;
mod server;

pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder, RelayState, router};

/// Convenient re-exports for building a relay.
pub mod prelude {
    pub use crate::{RelayError, RelayServer, RelayServerBuilder, RelayState, router};
    pub use sunrelay_config::{ConfigError, ConfigSource, EnvConfig, StaticConfig, keys};
    pub use sunrelay_gate::{ApiKeyGate, GateError};
    pub use sunrelay_protocol::{ErrorBody, ErrorCode, HealthStatus, ResetResponse};
    pub use sunrelay_session::{
        Credentials, Session, SessionError, SessionHandle, SessionManager, Upstream,
        UpstreamError, is_auth_error,
    };
}
