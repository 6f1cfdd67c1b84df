//! The public handle to a [`PoolWorker`] — cheap to clone, the only way
//! callers reach the dispatcher.

use std::{
    sync::{atomic::Ordering, Arc},
    time::Instant,
};

use tokio::sync::{mpsc, oneshot};

use crate::{
    connection::{Connection, PoolId},
    connector::Connector,
    endpoint::Endpoint,
    error::{PoolError, Result},
    events::{EventEmitter, PoolHandler},
    health::HealthChecker,
    options::PoolOptions,
    worker::{ControlMessage, PoolWorker, RequestMessage, SharedState},
};

/// A release that did not complete normally.
///
/// `connection` is `Some` whenever the pool never took ownership of the
/// connection (a `WrongPool` rejection, or the dispatcher having already
/// shut down) so the caller can route it elsewhere or drop it. It is `None`
/// when the dispatcher itself closed the connection before reporting the
/// error (a release that loses the race with `close`).
#[derive(Debug)]
pub struct ReleaseError {
    /// The error describing why the release was rejected.
    pub error: PoolError,
    /// The connection, if the pool never took ownership of it.
    pub connection: Option<Connection>,
}

/// A bounded, asynchronous connection pool for a single [`Endpoint`].
///
/// Cloning a `Pool` is cheap: all clones are handles onto the same
/// background dispatcher task. The pool itself does not materialize
/// connections eagerly; [`Pool::new`] only starts the dispatcher.
#[derive(Clone)]
pub struct Pool {
    pool_id: PoolId,
    endpoint: Endpoint,
    request_tx: mpsc::UnboundedSender<RequestMessage>,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    shared: Arc<SharedState>,
}

impl Pool {
    /// Starts a new pool dispatching to `endpoint`, using `connector` to
    /// establish new connections and `health_checker` to validate them.
    ///
    /// Returns [`PoolError::InvalidConfig`] if `options` describes an
    /// invalid configuration (see [`PoolOptions::validate`]).
    pub fn new<C, H>(
        endpoint: Endpoint,
        options: PoolOptions,
        connector: C,
        health_checker: H,
        handler: Option<Arc<dyn PoolHandler>>,
    ) -> Result<Self>
    where
        C: Connector,
        H: HealthChecker,
    {
        options.validate()?;

        let pool_id = PoolId::next();
        let events = EventEmitter::new(handler, endpoint.to_string());
        let (request_tx, control_tx, shared) =
            PoolWorker::start(pool_id, endpoint, options, connector, health_checker, events);

        Ok(Pool {
            pool_id,
            endpoint,
            request_tx,
            control_tx,
            shared: Arc::new(shared),
        })
    }

    /// The endpoint this pool dispatches connections to.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Acquires a connection, queuing if the pool is at capacity and failing
    /// immediately if the waiter queue is also full or the pool is closed.
    pub async fn acquire(&self) -> Result<Connection> {
        let (sink, recv) = oneshot::channel();
        if self.request_tx.send(RequestMessage::Acquire(sink)).is_err() {
            return Err(self.closed_error());
        }
        recv.await.unwrap_or_else(|_| Err(self.closed_error()))
    }

    /// Returns a connection to the pool. Rejects connections that did not
    /// originate from this pool without touching any counters.
    pub async fn release(&self, connection: Connection) -> std::result::Result<(), ReleaseError> {
        if connection.pool_of_origin() != self.pool_id {
            return Err(ReleaseError {
                error: PoolError::WrongPool {
                    connection_id: connection.id(),
                },
                connection: Some(connection),
            });
        }

        let (sink, recv) = oneshot::channel();
        let connection = match self
            .control_tx
            .send(ControlMessage::Release(connection, sink))
        {
            Ok(()) => None,
            Err(send_error) => {
                let ControlMessage::Release(connection, _) = send_error.0 else {
                    unreachable!("release always sends a Release message")
                };
                Some(connection)
            }
        };

        if let Some(connection) = connection {
            // The dispatcher is gone; nobody is left to release to.
            return Err(ReleaseError {
                error: self.closed_error(),
                connection: Some(connection),
            });
        }

        match recv.await {
            // The dispatcher already took ownership and, on failure, closed
            // the connection itself before replying.
            Ok(result) => result.map_err(|error| ReleaseError {
                error,
                connection: None,
            }),
            Err(_) => Ok(()),
        }
    }

    /// Closes the pool: drains queued waiters with [`PoolError::PoolClosed`],
    /// cancels their timers, and hands the idle reservoir's teardown off to
    /// a background task so closing can never deadlock on itself.
    ///
    /// Idempotent: closing an already-closed pool is a no-op success.
    pub async fn close_async(&self) -> Result<()> {
        let (sink, recv) = oneshot::channel();
        if self.control_tx.send(ControlMessage::Close(sink)).is_err() {
            return Ok(());
        }
        let _ = recv.await;
        Ok(())
    }

    /// Synchronous-style alias for [`Pool::close_async`]; provided for
    /// interface parity since every operation in this crate is already
    /// async.
    pub async fn close(&self) -> Result<()> {
        self.close_async().await
    }

    /// The number of connections currently in `acquired` state. Diagnostic
    /// only: may be slightly stale with respect to the dispatcher.
    pub fn acquired_count(&self) -> u32 {
        self.shared.acquired_count.load(Ordering::Relaxed)
    }

    /// The wall-clock time this pool last served an acquire or release.
    pub fn last_active_time(&self) -> Instant {
        *self.shared.last_active.lock().unwrap()
    }

    fn closed_error(&self) -> PoolError {
        PoolError::PoolClosed {
            endpoint: self.endpoint.to_string(),
        }
    }
}
