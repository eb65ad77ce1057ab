//! Connection table collaborator.
//!
//! The transport owns per-connection metadata. This layer only reads the
//! liveness flags and reads/advances the protocol status, through the
//! [`ConnectionTable`] trait.

use std::collections::HashMap;

use tracing::trace;

use crate::connection::{ConnectionId, ProtocolStatus};

/// The slice of per-connection metadata this layer works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: ConnectionId,
    active: bool,
    closed: bool,
    status: ProtocolStatus,
}

impl Connection {
    /// A freshly accepted connection.
    #[must_use]
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            active: true,
            closed: false,
            status: ProtocolStatus::default(),
        }
    }

    /// The connection's identifier.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current protocol status.
    #[must_use]
    pub fn status(&self) -> ProtocolStatus {
        self.status
    }

    /// Active in the transport and not closed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.active && !self.closed
    }

    /// Move the status forward to `next`.
    ///
    /// Requests to move backwards are ignored. Returns whether the status
    /// changed.
    pub fn advance(&mut self, next: ProtocolStatus) -> bool {
        let advanced = self.status.advance(next);
        if advanced == self.status {
            return false;
        }
        trace!(connection_id = %self.id, from = %self.status, to = %advanced, "protocol status advanced");
        self.status = advanced;
        true
    }

    /// Record that the HTTP layer recognized an upgrade request.
    pub fn mark_handshaking(&mut self) -> bool {
        self.advance(ProtocolStatus::Handshaking)
    }

    /// Record that the transport closed the connection.
    pub fn mark_closed(&mut self) {
        self.closed = true;
        self.active = false;
    }

    /// Reinitialize for a new physical connection reusing this identifier.
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }
}

/// Lookup of connections by identifier.
pub trait ConnectionTable {
    /// The connection, if known.
    fn get(&self, id: ConnectionId) -> Option<&Connection>;

    /// Mutable access to the connection, if known.
    fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection>;
}

/// In-memory connection table for a single worker.
#[derive(Debug, Default)]
pub struct ConnectionMap {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionMap {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted physical connection.
    ///
    /// An existing entry under the same identifier is reinitialized.
    pub fn accept(&mut self, id: ConnectionId) -> &mut Connection {
        let conn = self
            .connections
            .entry(id)
            .or_insert_with(|| Connection::new(id));
        conn.reset();
        conn
    }

    /// Mark a connection closed, keeping its entry.
    pub fn close(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.mark_closed();
        }
    }

    /// Drop a connection's entry.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Number of known connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl ConnectionTable for ConnectionMap {
    fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> ConnectionId {
        ConnectionId::new(raw)
    }

    #[test]
    fn test_new_connection() {
        let conn = Connection::new(id(1));
        assert_eq!(conn.status(), ProtocolStatus::Uninitialized);
        assert!(conn.is_alive());
    }

    #[test]
    fn test_status_is_monotonic() {
        let mut conn = Connection::new(id(1));
        let mut seen = vec![conn.status()];

        assert!(conn.mark_handshaking());
        seen.push(conn.status());
        assert!(conn.advance(ProtocolStatus::Active));
        seen.push(conn.status());
        assert!(!conn.advance(ProtocolStatus::Handshaking));
        seen.push(conn.status());
        assert!(!conn.mark_handshaking());
        seen.push(conn.status());

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(conn.status(), ProtocolStatus::Active);
    }

    #[test]
    fn test_closed_is_not_alive() {
        let mut conn = Connection::new(id(1));
        conn.advance(ProtocolStatus::Active);
        conn.mark_closed();
        assert!(!conn.is_alive());
        assert_eq!(conn.status(), ProtocolStatus::Active);
    }

    #[test]
    fn test_reset_for_new_physical_connection() {
        let mut table = ConnectionMap::new();
        table.accept(id(5)).advance(ProtocolStatus::Active);
        table.close(id(5));

        let conn = table.accept(id(5));
        assert_eq!(conn.status(), ProtocolStatus::Uninitialized);
        assert!(conn.is_alive());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let mut table = ConnectionMap::new();
        assert!(table.is_empty());
        table.accept(id(1));
        assert!(table.get(id(1)).is_some());
        assert!(table.get(id(2)).is_none());
        assert!(table.get_mut(id(1)).unwrap().mark_handshaking());
        assert!(table.remove(id(1)).is_some());
        assert!(table.get(id(1)).is_none());
    }
}
