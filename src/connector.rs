//! C1 — establishes new transport connections.

use async_trait::async_trait;

use crate::{connection::Transport, endpoint::Endpoint};

/// Establishes one new transport connection to a given remote address.
///
/// Stateless; implementations must not retry or apply their own timeouts —
/// both are the pool's responsibility. All I/O happens off the pool's
/// dispatcher; only the completion is ever observed there.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The error type a connect attempt can fail with. Wrapped as the opaque
    /// cause of [`crate::error::PoolError::ConnectFailed`].
    type Error: std::error::Error + Send + Sync + 'static;

    /// Attempts to establish a new connection to `endpoint`.
    async fn connect(&self, endpoint: Endpoint) -> Result<Box<dyn Transport>, Self::Error>;
}
