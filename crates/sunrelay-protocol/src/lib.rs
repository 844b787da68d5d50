//! Wire protocol for Sunrelay.
//!
//! This crate defines the JSON shapes that callers of the relay see:
//!
//! - **Types** ([`ErrorBody`], [`ErrorCode`], [`HealthStatus`],
//!   [`ResetResponse`], [`OperationName`]): what goes over HTTP.
//! - **Errors** ([`ProtocolError`]): malformed protocol values.
//!
//! It has no opinion on routing or status codes; the server crate maps
//! each [`ErrorCode`] to a status.

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{ErrorBody, ErrorCode, HealthStatus, OperationName, ResetResponse};
