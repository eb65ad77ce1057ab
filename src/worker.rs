//! Per-worker context: the connection table and transport one worker owns.
//!
//! Each worker drives its own set of connections on a single thread, so
//! everything here takes `&mut self` and needs no locking.

use tracing::{debug, warn};

use crate::connection::{ConnectionId, ConnectionTable};
use crate::error::{Error, Result};
use crate::protocol::frame;
use crate::protocol::opcode::check_opcode;
use crate::transport::Transport;

/// Outbound operations available to application handlers.
pub trait Outbound {
    /// Send one frame to connection `id`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConnection` if `id <= 0`, the connection is unknown,
    ///   or it has not started a websocket handshake
    /// - `Error::InvalidOpcode` if `opcode > 10`
    /// - `Error::EmptyPayload` if `data` is empty
    /// - `Error::SendFailed` if the transport rejects the bytes
    fn push(&mut self, id: ConnectionId, data: &[u8], opcode: u8, finish: bool) -> Result<()>;

    /// Whether `id` is a live connection that completed its handshake.
    fn exist(&self, id: ConnectionId) -> bool;

    /// Terminate connection `id`.
    fn close(&mut self, id: ConnectionId);
}

/// Connection table plus transport for one worker.
#[derive(Debug)]
pub struct Worker<C, T> {
    table: C,
    transport: T,
}

impl<C, T> Worker<C, T> {
    /// Bundle a worker's collaborators.
    pub fn new(table: C, transport: T) -> Self {
        Self { table, transport }
    }

    /// The connection table.
    pub fn table(&self) -> &C {
        &self.table
    }

    /// Mutable access to the connection table.
    pub fn table_mut(&mut self) -> &mut C {
        &mut self.table
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Split back into the collaborators.
    pub fn into_parts(self) -> (C, T) {
        (self.table, self.transport)
    }
}

impl<C: ConnectionTable, T: Transport> Outbound for Worker<C, T> {
    fn push(&mut self, id: ConnectionId, data: &[u8], opcode: u8, finish: bool) -> Result<()> {
        if !id.is_valid() {
            warn!(connection_id = %id, "push rejected: invalid connection id");
            return Err(Error::InvalidConnection(id.get()));
        }
        if let Err(e) = check_opcode(opcode) {
            warn!(connection_id = %id, opcode, "push rejected: opcode max 10");
            return Err(e);
        }
        if data.is_empty() {
            warn!(connection_id = %id, "push rejected: data is empty");
            return Err(Error::EmptyPayload);
        }

        let can_push = self
            .table
            .get(id)
            .is_some_and(|conn| conn.status().can_push());
        if !can_push {
            warn!(connection_id = %id, "push rejected: not a websocket client");
            return Err(Error::InvalidConnection(id.get()));
        }

        // Server-to-client frames are never masked.
        let bytes = frame::encode(opcode, data, finish, None)?;
        debug!(connection_id = %id, opcode, len = data.len(), finish, "push");
        self.transport.send(id, &bytes)
    }

    fn exist(&self, id: ConnectionId) -> bool {
        self.table
            .get(id)
            .is_some_and(|conn| conn.is_alive() && conn.status().is_active())
    }

    fn close(&mut self, id: ConnectionId) {
        debug!(connection_id = %id, "closing connection");
        if let Some(conn) = self.table.get_mut(id) {
            conn.mark_closed();
        }
        self.transport.close(id);
    }
}
