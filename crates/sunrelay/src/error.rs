//! Unified error type for the relay, and its HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sunrelay_config::ConfigError;
use sunrelay_gate::GateError;
use sunrelay_protocol::{ErrorBody, ErrorCode, ProtocolError};
use sunrelay_session::{SessionError, UpstreamError};

/// Top-level error that wraps all crate-specific errors.
///
/// Handlers return `Result<_, RelayError>` and let `?` convert whatever
/// the lower layers produced. [`IntoResponse`] then decides the status:
/// caller mistakes are 4xx, relay misconfiguration is 500, upstream
/// trouble is 502.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Relay configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A protocol value (e.g. an operation name) is malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The inbound gate refused the request.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The session layer failed (config, upstream login, or operation).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The request body is not valid JSON.
    #[error("invalid request body: {0}")]
    Validation(String),

    /// No route matched.
    #[error("endpoint not found")]
    NotFound,

    /// Binding or serving the listener failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UpstreamAuthFailed | ErrorCode::UpstreamError => {
                StatusCode::BAD_GATEWAY
            }
            ErrorCode::ServerMisconfigured | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The machine-readable code placed in the response body.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Gate(GateError::NotConfigured) => ErrorCode::ServerMisconfigured,
            Self::Gate(GateError::MissingCredential | GateError::InvalidCredential) => {
                ErrorCode::Unauthorized
            }
            Self::Config(_) | Self::Session(SessionError::Configuration(_)) => {
                ErrorCode::ServerMisconfigured
            }
            Self::Session(SessionError::Authentication(_)) => ErrorCode::UpstreamAuthFailed,
            Self::Session(SessionError::Upstream(UpstreamError::UnknownOperation(_))) => {
                ErrorCode::NotFound
            }
            Self::Session(SessionError::Upstream(_)) => ErrorCode::UpstreamError,
            Self::Protocol(_) | Self::Validation(_) => ErrorCode::ValidationError,
            Self::NotFound => ErrorCode::NotFound,
            Self::Io(_) => ErrorCode::InternalError,
        }
    }

    /// The human-readable message placed in the response body.
    ///
    /// Server-side faults get a generic message; the detail (which may
    /// name config keys) goes to the log instead.
    fn public_message(&self) -> String {
        match self {
            Self::Gate(GateError::MissingCredential) => "Missing Authorization header".into(),
            Self::Gate(GateError::InvalidCredential) => "Invalid API key".into(),
            Self::Gate(GateError::NotConfigured)
            | Self::Config(_)
            | Self::Session(SessionError::Configuration(_)) => {
                "Server is not properly configured".into()
            }
            Self::Io(_) => "An unexpected error occurred".into(),
            Self::NotFound => "Endpoint not found".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "request failed with server error");
        } else if status == StatusCode::BAD_GATEWAY {
            tracing::warn!(error = %self, "upstream failure");
        }

        let body = ErrorBody::new(self.code(), self.public_message());
        (status, Json(body)).into_response()
    }
}
