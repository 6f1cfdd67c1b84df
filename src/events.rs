//! Outbound callbacks fired at each connection state transition, and the
//! `tracing` emission that always accompanies them.
//!
//! Modeled on `CmapEventHandler`/`CmapEventEmitter`: a handler is optional,
//! but a `tracing` event is emitted at the same call sites regardless of
//! whether one is registered.

use std::sync::Arc;

use crate::connection::Connection;

/// User-supplied hooks fired at each connection state transition.
///
/// Ordering: `on_created` fires before the first `on_acquired` for a given
/// connection; `on_acquired` and `on_released` strictly alternate per
/// connection thereafter.
pub trait PoolHandler: Send + Sync + 'static {
    /// Fired once, right after a connection is established.
    fn on_created(&self, _connection: &Connection) {}
    /// Fired when a connection is dispatched to a caller.
    fn on_acquired(&self, _connection: &Connection) {}
    /// Fired when a connection is returned via `release`.
    fn on_released(&self, _connection: &Connection) {}
}

/// A `PoolHandler` that does nothing, used when no handler is registered.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NoopHandler;

impl PoolHandler for NoopHandler {}

/// Fans an event out to the optional user handler and to `tracing`, mirroring
/// `CmapEventEmitter::emit_event`.
#[derive(Clone)]
pub(crate) struct EventEmitter {
    handler: Arc<dyn PoolHandler>,
    endpoint: String,
}

impl EventEmitter {
    pub(crate) fn new(handler: Option<Arc<dyn PoolHandler>>, endpoint: String) -> Self {
        EventEmitter {
            handler: handler.unwrap_or_else(|| Arc::new(NoopHandler)),
            endpoint,
        }
    }

    pub(crate) fn pool_created(&self) {
        tracing::info!(endpoint = %self.endpoint, "pool created");
    }

    pub(crate) fn checkout_started(&self) {
        tracing::trace!(endpoint = %self.endpoint, "connection checkout started");
    }

    pub(crate) fn created(&self, connection: &Connection) {
        tracing::debug!(endpoint = %self.endpoint, connection_id = connection.id(), "connection created");
        self.handler.on_created(connection);
    }

    pub(crate) fn acquired(&self, connection: &Connection) {
        tracing::trace!(endpoint = %self.endpoint, connection_id = connection.id(), "connection acquired");
        self.handler.on_acquired(connection);
    }

    pub(crate) fn released(&self, connection: &Connection) {
        tracing::trace!(endpoint = %self.endpoint, connection_id = connection.id(), "connection released");
        self.handler.on_released(connection);
    }

    pub(crate) fn closed(&self, connection_id: u64, reason: &str) {
        tracing::debug!(endpoint = %self.endpoint, connection_id, reason, "connection closed");
    }

    pub(crate) fn pool_closed(&self) {
        tracing::info!(endpoint = %self.endpoint, "pool closed");
    }
}
