//! C2 — the predicate that decides whether a connection is still usable.

use crate::connection::Connection;

/// A pure, cheap, synchronous predicate over a connection handle.
///
/// The pool treats this as authoritative and never second-guesses it: once a
/// health checker reports a connection unhealthy, the pool discards it.
/// Implementations range from "the socket hasn't errored" to a full
/// round-trip probe run eagerly before this call.
pub trait HealthChecker: Send + Sync + 'static {
    /// Returns whether `connection` is still live and usable.
    fn is_healthy(&self, connection: &Connection) -> bool;
}

/// A health checker built from a plain function, for simple predicates and
/// tests.
pub struct FnHealthChecker<F>(F);

impl<F> FnHealthChecker<F>
where
    F: Fn(&Connection) -> bool + Send + Sync + 'static,
{
    /// Wraps `f` as a [`HealthChecker`].
    pub fn new(f: F) -> Self {
        FnHealthChecker(f)
    }
}

impl<F> HealthChecker for FnHealthChecker<F>
where
    F: Fn(&Connection) -> bool + Send + Sync + 'static,
{
    fn is_healthy(&self, connection: &Connection) -> bool {
        (self.0)(connection)
    }
}

/// A health checker that always reports the connection as healthy, useful
/// when the transport itself guarantees liveness or for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysHealthy;

impl HealthChecker for AlwaysHealthy {
    fn is_healthy(&self, _connection: &Connection) -> bool {
        true
    }
}
