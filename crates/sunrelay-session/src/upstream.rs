//! The upstream service, as the relay sees it.
//!
//! Sunrelay does not speak the upstream protocol itself. That is the job
//! of whatever client library you wrap in an [`Upstream`] implementation.
//! The session manager only needs three things from it: a way to log in,
//! a way to log out, and a way to run named operations.
//!
//! # Why a trait?
//!
//! - Production wraps the real upstream client.
//! - The demo binary uses an in-memory fake whose sessions expire.
//! - Tests use counting mocks that fail on cue.
//!
//! None of those require changes to the session manager.

use std::future::Future;

use serde_json::Value;

use crate::{Credentials, UpstreamError};

/// A client for the upstream service.
///
/// # Trait bounds
///
/// - `Send + Sync` → one instance is shared by every request task.
/// - `'static` → it lives as long as the server.
///
/// # Example
///
/// ```rust
/// use sunrelay_session::{Credentials, Upstream, UpstreamError};
///
/// struct Client {
///     token: String,
/// }
///
/// struct MyUpstream;
///
/// impl Upstream for MyUpstream {
///     type Connection = Client;
///
///     async fn login(
///         &self,
///         credentials: &Credentials,
///     ) -> Result<Client, UpstreamError> {
///         // Call the real login endpoint here.
///         Ok(Client { token: format!("token-for-{}", credentials.principal()) })
///     }
///
///     async fn logout(&self, _client: &Client) -> Result<(), UpstreamError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Upstream: Send + Sync + 'static {
    /// An authenticated client handle produced by [`login`](Self::login).
    type Connection: Send + Sync + 'static;

    /// Logs in and returns a connection.
    ///
    /// # Returns
    /// - `Ok(Connection)`: credentials accepted
    /// - `Err(UpstreamError)`: rejected (or the upstream is unreachable)
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Connection, UpstreamError>> + Send;

    /// Ends a connection's upstream session.
    ///
    /// Best-effort: the manager logs and ignores any error returned here.
    fn logout(
        &self,
        connection: &Self::Connection,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;

    /// Runs a named operation with JSON arguments.
    ///
    /// This is the generic entry point the relay's HTTP layer uses. The
    /// default knows no operations at all, so implementations that are
    /// only ever driven through typed closures can skip it.
    fn invoke(
        &self,
        connection: &Self::Connection,
        operation: &str,
        args: Value,
    ) -> impl Future<Output = Result<Value, UpstreamError>> + Send {
        let _ = (connection, args);
        let operation = operation.to_string();
        async move { Err(UpstreamError::UnknownOperation(operation)) }
    }
}
