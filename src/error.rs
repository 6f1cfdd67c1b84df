//! Contains the [`PoolError`] and [`Result`] types used throughout this crate.

use std::{fmt, sync::Arc};

use thiserror::Error;

/// The result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, PoolError>;

/// The error taxonomy surfaced to callers of the pool.
///
/// Internal invariant violations (negative counters, a queue longer than its
/// bound) are not represented here: they are checked with `debug_assert!` at
/// the point of violation and are treated as bugs, not reportable errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool was closed before or during the operation.
    #[error("the connection pool for {endpoint} is closed")]
    PoolClosed {
        /// The endpoint of the pool that was closed.
        endpoint: String,
    },

    /// The waiter queue was full and no connection slot was available.
    #[error("the connection pool for {endpoint} has reached its maximum of {max_pending} pending acquires")]
    TooManyOutstanding {
        /// The endpoint of the pool that rejected the acquire.
        endpoint: String,
        /// The configured `max_pending` bound.
        max_pending: u32,
    },

    /// A queued acquire's deadline elapsed before a connection was dispatched to it.
    #[error("acquiring a connection from {endpoint} timed out after {waited_ms}ms")]
    AcquireTimeout {
        /// The endpoint of the pool the waiter was queued on.
        endpoint: String,
        /// How long the waiter was queued for, in milliseconds.
        waited_ms: u64,
    },

    /// A connection was released to a pool that did not originate it.
    ///
    /// The pool's counters and reservoir are left untouched when this is returned.
    #[error("connection {connection_id} was released to a pool it was not acquired from")]
    WrongPool {
        /// The identity of the misrouted connection.
        connection_id: u64,
    },

    /// The connector failed to establish a new connection.
    #[error("failed to connect to {endpoint}: {cause}")]
    ConnectFailed {
        /// The endpoint that could not be connected to.
        endpoint: String,
        /// The opaque cause reported by the connector.
        #[source]
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// A freshly acquired connection failed its health check.
    #[error("connection {connection_id} from {endpoint} failed its health check")]
    UnhealthyConnection {
        /// The endpoint the connection belonged to.
        endpoint: String,
        /// The identity of the unhealthy connection.
        connection_id: u64,
    },

    /// The pool was constructed with an invalid combination of options.
    #[error("invalid pool configuration: {message}")]
    InvalidConfig {
        /// A human-readable description of the invalid configuration.
        message: String,
    },
}

impl PoolError {
    pub(crate) fn connect_failed(
        endpoint: impl fmt::Display,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PoolError::ConnectFailed {
            endpoint: endpoint.to_string(),
            cause: Arc::new(cause),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connect_failed_wraps_the_cause_and_reports_it_as_the_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = PoolError::connect_failed("127.0.0.1:1", io_err);

        assert!(err.to_string().contains("127.0.0.1:1"));
        assert!(err.to_string().contains("refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn pool_error_is_cloneable() {
        let err = PoolError::WrongPool { connection_id: 7 };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
