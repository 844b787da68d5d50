//! Axum middleware that runs the inbound API-key gate.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use sunrelay_gate::ApiKeyGate;

use crate::RelayError;

/// Rejects the request unless its `Authorization` header passes the gate.
///
/// A header that is present but not valid UTF-8 is checked as an empty
/// token, so it is reported as invalid rather than missing.
pub(crate) async fn require_api_key(
    State(gate): State<ApiKeyGate>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    gate.check(header)?;

    Ok(next.run(request).await)
}
