//! The [`Connection`] type owned and arbitrated by a [`crate::pool::Pool`].

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::endpoint::Endpoint;

/// A boxed, bidirectional byte stream. Implementations are supplied by a
/// [`crate::connector::Connector`]; this crate never constructs one itself.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Transport for T {}

/// Identifies the pool instance that created a [`Connection`], so that a
/// misrouted `release` can be rejected without touching any counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PoolId(u64);

impl PoolId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PoolId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The ownership state of a [`Connection`]. `Closed` is terminal; no further
/// transitions are valid once reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionState {
    /// Held by the pool, not currently handed to a caller.
    Idle,
    /// Handed out to a caller.
    Acquired,
    /// Torn down; the connection may not be reused.
    Closed,
}

/// An owned, bidirectional byte stream bound to an [`Endpoint`].
///
/// Created in `acquired` state by a [`crate::connector::Connector`]. The only
/// legal transitions are `acquired -> idle` via a successful `release` on its
/// pool of origin, and `idle -> acquired` via a successful dispatch from that
/// same pool.
pub struct Connection {
    id: u64,
    endpoint: Endpoint,
    pool_of_origin: PoolId,
    state: ConnectionState,
    stream: Box<dyn Transport>,
}

impl Connection {
    /// Wraps a freshly established transport as a `Connection` in `acquired`
    /// state, stamped with the identity of the pool that will own it.
    pub(crate) fn new(
        id: u64,
        endpoint: Endpoint,
        pool_of_origin: PoolId,
        stream: Box<dyn Transport>,
    ) -> Self {
        Connection {
            id,
            endpoint,
            pool_of_origin,
            state: ConnectionState::Acquired,
            stream,
        }
    }

    /// The monotonically assigned identity of this connection, unique within
    /// its pool of origin.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The endpoint this connection is bound to.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// The pool that created this connection.
    pub fn pool_of_origin(&self) -> PoolId {
        self.pool_of_origin
    }

    /// The current ownership state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Grants mutable access to the underlying transport for I/O.
    pub fn stream_mut(&mut self) -> &mut dyn Transport {
        &mut *self.stream
    }

    pub(crate) fn mark_idle(&mut self) {
        debug_assert_eq!(self.state, ConnectionState::Acquired);
        self.state = ConnectionState::Idle;
    }

    pub(crate) fn mark_acquired(&mut self) {
        debug_assert_eq!(self.state, ConnectionState::Idle);
        self.state = ConnectionState::Acquired;
    }

    pub(crate) fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish()
    }
}
