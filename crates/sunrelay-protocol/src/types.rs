//! Types that travel over the relay's HTTP API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Errors on the wire
// ---------------------------------------------------------------------------

/// Machine-readable error category, serialized as `"SCREAMING_SNAKE_CASE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or wrong API key.
    Unauthorized,
    /// The relay itself is missing configuration.
    ServerMisconfigured,
    /// The request body or path could not be understood.
    ValidationError,
    /// No such route or operation.
    NotFound,
    /// The upstream service refused the relay's own login.
    UpstreamAuthFailed,
    /// The upstream service failed the proxied operation.
    UpstreamError,
    /// Anything else.
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ServerMisconfigured => "SERVER_MISCONFIGURED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::UpstreamAuthFailed => "UPSTREAM_AUTH_FAILED",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(s)
    }
}

/// The body of every error response.
///
/// ```json
/// { "error": "UNAUTHORIZED", "message": "Invalid API key" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"ok"` when the relay answers at all.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Whether the relay currently holds an upstream session.
    pub authenticated: bool,
}

impl HealthStatus {
    pub fn ok(authenticated: bool) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            authenticated,
        }
    }
}

/// Response of `POST /api/session/reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub reset: bool,
}

// ---------------------------------------------------------------------------
// OperationName
// ---------------------------------------------------------------------------

/// A validated upstream operation name, as taken from a request path.
///
/// Newtype so handlers cannot pass an unchecked path segment to the
/// upstream by accident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationName(String);

impl OperationName {
    /// Longest accepted name, in bytes.
    pub const MAX_LEN: usize = 64;

    /// Validates `raw` as an operation name.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidOperationName`] if `raw` is empty, too
    /// long, or contains anything other than ASCII letters, digits, `_`,
    /// `-`, or `.`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let well_formed = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));

        if !well_formed {
            return Err(ProtocolError::InvalidOperationName(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
