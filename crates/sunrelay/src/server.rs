//! `RelayServer` builder, router, and serve loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: HTTP → gate → handlers → session manager → upstream.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use sunrelay_config::{ConfigSource, EnvConfig, RelayConfig};
use sunrelay_gate::ApiKeyGate;
use sunrelay_session::{SessionManager, Upstream};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::RelayError;
use crate::gate::require_api_key;
use crate::handler;

/// Shared state passed to every handler.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The session
/// manager does its own locking internally.
pub struct RelayState<U: Upstream> {
    sessions: SessionManager<U>,
    gate: ApiKeyGate,
}

impl<U: Upstream> RelayState<U> {
    /// Builds state where both the session manager and the gate read
    /// from the same config source.
    pub fn new(upstream: U, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            sessions: SessionManager::new(upstream, Arc::clone(&config)),
            gate: ApiKeyGate::new(config),
        }
    }

    pub fn sessions(&self) -> &SessionManager<U> {
        &self.sessions
    }

    pub fn gate(&self) -> &ApiKeyGate {
        &self.gate
    }
}

/// Builds the relay's router.
///
/// Exposed so tests (and embedders with their own listener) can drive the
/// relay in-process.
///
/// | Route | Gate | Handler |
/// |-------|------|---------|
/// | `GET /health` | no | liveness |
/// | `POST /api/ops/{operation}` | yes | run an upstream operation |
/// | `POST /api/session/reset` | yes | drop the upstream session |
/// | any other `/api/*` | yes | 404 |
///
/// Unknown `/api` paths are gated too, so callers without a key cannot
/// tell which routes exist.
pub fn router<U: Upstream>(state: Arc<RelayState<U>>) -> Router {
    let api = Router::new()
        .route("/ops/{operation}", post(handler::invoke_operation::<U>))
        .route("/session/reset", post(handler::reset_session::<U>))
        .fallback(handler::not_found)
        .layer(middleware::from_fn_with_state(
            state.gate().clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(handler::health::<U>))
        .nest("/api", api)
        .fallback(handler::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,ignore
/// use sunrelay::prelude::*;
///
/// let server = RelayServerBuilder::new()
///     .bind("127.0.0.1:3000")
///     .build(MyUpstream::new())
///     .await?;
/// server.run().await
/// ```
pub struct RelayServerBuilder {
    bind_addr: Option<String>,
    config: Arc<dyn ConfigSource>,
}

impl RelayServerBuilder {
    /// Creates a builder that reads configuration from the environment
    /// and binds to `HOST`:`PORT` (default `0.0.0.0:3000`).
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            config: Arc::new(EnvConfig),
        }
    }

    /// Overrides the bind address instead of reading `HOST`/`PORT`.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Sets the configuration source for credentials and the API key.
    pub fn config(mut self, config: Arc<dyn ConfigSource>) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and builds the server around `upstream`.
    ///
    /// Does not log in; the first operation request does that.
    ///
    /// # Errors
    /// - [`RelayError::Config`]: `PORT` is malformed
    /// - [`RelayError::Io`]: the address cannot be bound
    pub async fn build<U: Upstream>(self, upstream: U) -> Result<RelayServer<U>, RelayError> {
        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => RelayConfig::from_source(self.config.as_ref())?.bind_addr(),
        };

        let listener = TcpListener::bind(&bind_addr).await?;
        let state = Arc::new(RelayState::new(upstream, self.config));

        Ok(RelayServer { listener, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay, ready to serve.
///
/// Call [`run()`](Self::run) to start accepting requests.
pub struct RelayServer<U: Upstream> {
    listener: TcpListener,
    state: Arc<RelayState<U>>,
}

impl<U: Upstream> RelayServer<U> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared state, e.g. to reset the upstream session from outside
    /// the HTTP surface.
    pub fn state(&self) -> &Arc<RelayState<U>> {
        &self.state
    }

    /// Serves requests until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves requests until `shutdown` resolves, then drains in-flight
    /// requests and returns.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RelayError> {
        let addr = self.listener.local_addr()?;
        tracing::info!(%addr, "sunrelay listening");

        axum::serve(self.listener, router(Arc::clone(&self.state)))
            .with_graceful_shutdown(shutdown)
            .await?;

        // Leave the upstream with nothing dangling.
        self.state.sessions().reset_session().await;
        tracing::info!("sunrelay stopped");
        Ok(())
    }
}
