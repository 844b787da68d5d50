//! Route handlers.
//!
//! Handlers are thin: they validate input, call into the session manager,
//! and let [`RelayError`] turn failures into responses. All retry and
//! classification decisions live in [`SessionManager::with_session`](sunrelay_session::SessionManager::with_session).

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::Value;
use sunrelay_protocol::{HealthStatus, OperationName, ResetResponse};
use sunrelay_session::Upstream;

use crate::RelayError;
use crate::server::RelayState;

/// `GET /health`: liveness plus whether an upstream session is held.
///
/// Not gated and never touches the upstream.
pub(crate) async fn health<U: Upstream>(
    State(state): State<Arc<RelayState<U>>>,
) -> Json<HealthStatus> {
    Json(HealthStatus::ok(state.sessions().is_authenticated()))
}

/// `POST /api/ops/{operation}`: runs a named upstream operation.
///
/// The JSON body becomes the operation's arguments; an empty body is
/// passed as `null`.
pub(crate) async fn invoke_operation<U: Upstream>(
    State(state): State<Arc<RelayState<U>>>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let operation = OperationName::parse(&operation)?;
    let args = parse_args(&body)?;

    tracing::debug!(%operation, "proxying upstream operation");

    let sessions = state.sessions();
    let upstream = sessions.upstream();
    let name = operation.as_str();

    let value = sessions
        .with_session(|session| {
            let args = args.clone();
            async move { upstream.invoke(session.connection(), name, args).await }
        })
        .await?;

    Ok(Json(value))
}

/// `POST /api/session/reset`: drops the upstream session so the next
/// operation logs in again. For operators; no restart needed.
pub(crate) async fn reset_session<U: Upstream>(
    State(state): State<Arc<RelayState<U>>>,
) -> Json<ResetResponse> {
    state.sessions().reset_session().await;
    tracing::info!("upstream session reset on request");
    Json(ResetResponse { reset: true })
}

/// Fallback for unmatched routes.
pub(crate) async fn not_found() -> RelayError {
    RelayError::NotFound
}

fn parse_args(body: &[u8]) -> Result<Value, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| RelayError::Validation(e.to_string()))
}
