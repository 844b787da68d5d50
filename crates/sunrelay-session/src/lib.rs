//! Upstream session management for Sunrelay.
//!
//! The relay keeps exactly one authenticated connection to the upstream
//! service and shares it between every inbound request. This crate owns
//! that connection:
//!
//! 1. **Upstream access**: the [`Upstream`] trait: log in, log out, run
//!    named operations
//! 2. **Session brokering**: [`SessionManager`]: lazy login, shared
//!    session, serialized transitions
//! 3. **Failure classification**: [`is_auth_error`]: does this failure
//!    mean the session expired?
//! 4. **Retry-once**: [`SessionManager::with_session`] re-authenticates
//!    and retries a failed operation a single time
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (above)   ← gate, routing, error → status mapping
//!     ↕
//! Session layer (this crate)  ← one upstream session, retry-once
//!     ↕
//! Upstream client (below)     ← speaks the upstream's own protocol
//! ```

mod classify;
mod error;
mod manager;
mod session;
mod upstream;

pub use classify::{AUTH_MESSAGE_MARKERS, is_auth_error, message_indicates_auth};
pub use error::{SessionError, UpstreamError};
pub use manager::{SessionHandle, SessionManager};
pub use session::{Credentials, Session};
pub use upstream::Upstream;
