//! The key the [`crate::map::PoolMap`] uses to look up a pool.

use std::{fmt, net::SocketAddr};

/// An immutable remote address. Equality and hashing are bitwise over the
/// resolved address bytes, matching [`SocketAddr`]'s own semantics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    /// Wraps a resolved socket address as an `Endpoint`.
    pub fn new(addr: SocketAddr) -> Self {
        Endpoint(addr)
    }

    /// Returns the underlying resolved address.
    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Endpoint(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
