//! Integration tests for the relay router, gate, and full request flow.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use serde_json::{Value, json};
use sunrelay::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

// =========================================================================
// Mock upstream
// =========================================================================

struct TestConn {
    login: usize,
}

/// Upstream with a handful of scripted operations:
///
/// - `echo` returns its arguments
/// - `whoami` returns the login number of the session it ran on
/// - `flaky` reports an expired session the first time it is ever called
/// - `alwaysExpired` always reports an auth failure
/// - `explode` fails with a non-auth error
#[derive(Default)]
struct TestUpstream {
    logins: AtomicUsize,
    logouts: AtomicUsize,
    flaky_tripped: AtomicBool,
}

impl TestUpstream {
    fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl Upstream for TestUpstream {
    type Connection = TestConn;

    async fn login(&self, credentials: &Credentials) -> Result<TestConn, UpstreamError> {
        if credentials.secret() != "hunter2" {
            return Err(UpstreamError::Auth("invalid email or password".into()));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let login = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TestConn { login })
    }

    async fn logout(&self, _connection: &TestConn) -> Result<(), UpstreamError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn invoke(
        &self,
        connection: &TestConn,
        operation: &str,
        args: Value,
    ) -> Result<Value, UpstreamError> {
        match operation {
            "echo" => Ok(args),
            "whoami" => Ok(json!({ "login": connection.login })),
            "flaky" => {
                if self.flaky_tripped.swap(true, Ordering::SeqCst) {
                    Ok(json!({ "login": connection.login }))
                } else {
                    Err(UpstreamError::other("Session expired, please log in again"))
                }
            }
            "alwaysExpired" => Err(UpstreamError::Api {
                status: 401,
                message: "token revoked".into(),
            }),
            "explode" => Err(UpstreamError::other("database on fire")),
            other => Err(UpstreamError::UnknownOperation(other.to_string())),
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

const API_KEY: &str = "s3cr3t";

fn full_config() -> Arc<StaticConfig> {
    Arc::new(
        StaticConfig::new()
            .with(keys::API_KEY, API_KEY)
            .with(keys::UPSTREAM_PRINCIPAL, "me@example.com")
            .with(keys::UPSTREAM_SECRET, "hunter2"),
    )
}

fn state_with(config: Arc<StaticConfig>) -> Arc<RelayState<TestUpstream>> {
    Arc::new(RelayState::new(TestUpstream::default(), config))
}

fn app(state: &Arc<RelayState<TestUpstream>>) -> Router {
    router(Arc::clone(state))
}

/// Sends one request through the router and decodes the JSON response.
async fn send(
    app: Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    let request = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn call_op(
    state: &Arc<RelayState<TestUpstream>>,
    operation: &str,
    body: &str,
) -> (StatusCode, Value) {
    let bearer = format!("Bearer {API_KEY}");
    send(
        app(state),
        "POST",
        &format!("/api/ops/{operation}"),
        Some(bearer.as_str()),
        body,
    )
    .await
}

// =========================================================================
// Health and routing
// =========================================================================

#[tokio::test]
async fn test_health_needs_no_auth_and_does_not_log_in() {
    let state = state_with(full_config());

    let (status, body) = send(app(&state), "GET", "/health", None, "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["authenticated"], false);
    assert!(body["timestamp"].is_string());
    assert_eq!(state.sessions().upstream().logins(), 0);
}

#[tokio::test]
async fn test_unknown_route_returns_not_found_json() {
    let state = state_with(full_config());

    let (status, body) = send(app(&state), "GET", "/nope", None, "").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Endpoint not found");
}

// =========================================================================
// Inbound gate
// =========================================================================

#[tokio::test]
async fn test_gate_runs_before_unknown_api_route() {
    let state = state_with(full_config());

    let (status, _) = send(app(&state), "GET", "/api/nope", None, "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(app(&state), "GET", "/api/nope", Some(API_KEY), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_gate_missing_header_returns_401() {
    let state = state_with(full_config());

    let (status, body) = send(app(&state), "POST", "/api/ops/echo", None, "{}").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(body["message"], "Missing Authorization header");
}

#[tokio::test]
async fn test_gate_wrong_key_returns_401_and_never_reaches_upstream() {
    let state = state_with(full_config());

    let (status, body) =
        send(app(&state), "POST", "/api/ops/echo", Some("Bearer wrong"), "{}").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid API key");
    assert_eq!(state.sessions().upstream().logins(), 0);
}

#[tokio::test]
async fn test_gate_unconfigured_key_returns_500() {
    let config = full_config();
    config.remove(keys::API_KEY);
    let state = state_with(config);

    let (status, body) =
        send(app(&state), "POST", "/api/ops/echo", Some(API_KEY), "{}").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "SERVER_MISCONFIGURED");
}

#[tokio::test]
async fn test_gate_accepts_bare_and_bearer_keys() {
    let state = state_with(full_config());

    for auth in [API_KEY.to_string(), format!("Bearer {API_KEY}")] {
        let (status, body) = send(
            app(&state),
            "POST",
            "/api/ops/echo",
            Some(auth.as_str()),
            r#"{"hello":"world"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "auth {auth:?} should pass");
        assert_eq!(body, json!({ "hello": "world" }));
    }
}

#[tokio::test]
async fn test_gate_rotated_key_takes_effect_without_restart() {
    let config = full_config();
    let state = state_with(Arc::clone(&config));

    config.set(keys::API_KEY, "rotated");

    let (status, _) =
        send(app(&state), "POST", "/api/session/reset", Some(API_KEY), "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send(app(&state), "POST", "/api/session/reset", Some("rotated"), "").await;
    assert_eq!(status, StatusCode::OK);
}

// =========================================================================
// Operations and the session lifecycle
// =========================================================================

#[tokio::test]
async fn test_operations_share_one_lazy_login() {
    let state = state_with(full_config());

    let (_, first) = call_op(&state, "whoami", "").await;
    let (_, second) = call_op(&state, "whoami", "").await;

    assert_eq!(first["login"], 1);
    assert_eq!(second["login"], 1);
    assert_eq!(state.sessions().upstream().logins(), 1);

    let (_, health) = send(app(&state), "GET", "/health", None, "").await;
    assert_eq!(health["authenticated"], true);
}

#[tokio::test]
async fn test_expired_session_is_refreshed_and_retried_transparently() {
    let state = state_with(full_config());
    call_op(&state, "whoami", "").await;

    let (status, body) = call_op(&state, "flaky", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login"], 2, "retry runs on the fresh session");
    assert_eq!(state.sessions().upstream().logins(), 2);
    assert_eq!(state.sessions().upstream().logouts(), 1);
}

#[tokio::test]
async fn test_persistent_auth_failure_retries_once_then_502() {
    let state = state_with(full_config());

    let (status, body) = call_op(&state, "alwaysExpired", "").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UPSTREAM_ERROR");
    assert_eq!(state.sessions().upstream().logins(), 2);
}

#[tokio::test]
async fn test_non_auth_failure_is_502_without_retry() {
    let state = state_with(full_config());

    let (status, body) = call_op(&state, "explode", "").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UPSTREAM_ERROR");
    assert_eq!(body["message"], "database on fire");
    assert_eq!(state.sessions().upstream().logins(), 1);
}

#[tokio::test]
async fn test_unknown_operation_returns_404() {
    let state = state_with(full_config());

    let (status, body) = call_op(&state, "doesNotExist", "").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_operation_name_returns_400() {
    let state = state_with(full_config());

    let (status, body) = call_op(&state, "bad%20name", "").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(state.sessions().upstream().logins(), 0);
}

#[tokio::test]
async fn test_malformed_json_body_returns_400() {
    let state = state_with(full_config());

    let (status, body) = call_op(&state, "echo", "{oops").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_upstream_credentials_returns_500() {
    let config = full_config();
    config.remove(keys::UPSTREAM_PRINCIPAL);
    let state = state_with(config);

    let (status, body) = call_op(&state, "whoami", "").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "SERVER_MISCONFIGURED");
}

#[tokio::test]
async fn test_rejected_upstream_login_returns_502() {
    let config = full_config();
    config.set(keys::UPSTREAM_SECRET, "wrong");
    let state = state_with(config);

    let (status, body) = call_op(&state, "whoami", "").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UPSTREAM_AUTH_FAILED");
    assert!(!state.sessions().is_authenticated());
}

#[tokio::test]
async fn test_reset_endpoint_forces_fresh_login() {
    let state = state_with(full_config());
    call_op(&state, "whoami", "").await;

    let bearer = format!("Bearer {API_KEY}");
    let (status, body) =
        send(app(&state), "POST", "/api/session/reset", Some(bearer.as_str()), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "reset": true }));
    assert!(!state.sessions().is_authenticated());

    let (_, after) = call_op(&state, "whoami", "").await;
    assert_eq!(after["login"], 2);
    assert_eq!(state.sessions().upstream().logouts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_log_in_once() {
    let state = state_with(full_config());

    let requests = (0..8).map(|_| {
        let state = Arc::clone(&state);
        async move { call_op(&state, "whoami", "").await }
    });
    let responses = futures_util::future::join_all(requests).await;

    for (status, body) in responses {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["login"], 1);
    }
    assert_eq!(state.sessions().upstream().logins(), 1);
}

// =========================================================================
// Real listener
// =========================================================================

#[tokio::test]
async fn test_server_serves_health_over_tcp_and_shuts_down() {
    let config: Arc<dyn ConfigSource> = full_config();
    let server = RelayServerBuilder::new()
        .bind("127.0.0.1:0")
        .config(config)
        .build(TestUpstream::default())
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("should have local addr");
    let state = Arc::clone(server.state());

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));

    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("should connect");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("should write");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("should read");

    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.contains(r#""status":"ok""#));

    // Give the server a session so shutdown has something to release.
    state.sessions().get_session().await.expect("login should succeed");
    assert!(state.sessions().is_authenticated());

    stop_tx.send(()).expect("server should still be running");
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .expect("server task should not panic");
    assert!(result.is_ok());
    assert!(!state.sessions().is_authenticated(), "shutdown resets the session");
    assert_eq!(state.sessions().upstream().logouts(), 1);
}

#[tokio::test]
async fn test_builder_malformed_port_is_config_error() {
    let config: Arc<dyn ConfigSource> =
        Arc::new(StaticConfig::new().with(keys::PORT, "not-a-port"));

    let result = RelayServerBuilder::new()
        .config(config)
        .build(TestUpstream::default())
        .await;

    assert!(matches!(result, Err(RelayError::Config(_))));
}
