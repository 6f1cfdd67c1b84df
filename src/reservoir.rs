//! C3 — the multiset of connections held by the pool but not checked out.

use std::collections::VecDeque;

use crate::{connection::Connection, options::SelectionOrder};

/// Holds connections that are not currently handed out. `offer`, `take`, and
/// `discard` are all O(1). Touched only from the owning pool's dispatcher —
/// no locking is needed.
pub(crate) struct IdleReservoir {
    order: SelectionOrder,
    connections: VecDeque<Connection>,
}

impl IdleReservoir {
    pub(crate) fn new(order: SelectionOrder) -> Self {
        IdleReservoir {
            order,
            connections: VecDeque::new(),
        }
    }

    /// Inserts a connection into the reservoir.
    pub(crate) fn offer(&mut self, connection: Connection) {
        self.connections.push_back(connection);
    }

    /// Removes and returns a connection per the configured selection order,
    /// or `None` if the reservoir is empty.
    pub(crate) fn take(&mut self) -> Option<Connection> {
        match self.order {
            // LIFO: the most recently offered connection is at the back.
            SelectionOrder::Lifo => self.connections.pop_back(),
            // FIFO: the oldest connection is at the front.
            SelectionOrder::Fifo => self.connections.pop_front(),
        }
    }

    /// The number of connections currently held.
    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }

    /// Drains every connection out of the reservoir, for use during close.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Connection> + '_ {
        self.connections.drain(..)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{connection::PoolId, endpoint::Endpoint};
    use std::net::SocketAddr;

    fn connection(id: u64) -> Connection {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let (a, _b) = tokio::io::duplex(8);
        let mut conn = Connection::new(id, Endpoint::new(addr), PoolId::next(), Box::new(a));
        conn.mark_idle();
        conn
    }

    #[test]
    fn lifo_hands_back_most_recently_offered() {
        let mut reservoir = IdleReservoir::new(SelectionOrder::Lifo);
        reservoir.offer(connection(1));
        reservoir.offer(connection(2));
        assert_eq!(reservoir.take().unwrap().id(), 2);
        assert_eq!(reservoir.take().unwrap().id(), 1);
        assert!(reservoir.take().is_none());
    }

    #[test]
    fn fifo_hands_back_oldest_offered() {
        let mut reservoir = IdleReservoir::new(SelectionOrder::Fifo);
        reservoir.offer(connection(1));
        reservoir.offer(connection(2));
        assert_eq!(reservoir.take().unwrap().id(), 1);
        assert_eq!(reservoir.take().unwrap().id(), 2);
    }

    #[test]
    fn len_and_drain_reflect_contents() {
        let mut reservoir = IdleReservoir::new(SelectionOrder::Lifo);
        reservoir.offer(connection(1));
        reservoir.offer(connection(2));
        assert_eq!(reservoir.len(), 2);
        assert_eq!(reservoir.drain().count(), 2);
        assert_eq!(reservoir.len(), 0);
    }
}
