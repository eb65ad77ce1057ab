//! Transport collaborator: getting bytes onto a connection.
//!
//! The event loop owning the sockets implements [`Transport`]. Sends are
//! expected not to block; this layer never retries them.

use std::collections::{HashMap, HashSet};

use bytes::{Bytes, BytesMut};

use crate::connection::ConnectionId;
use crate::error::{Error, Result};

/// Write side of the transport.
pub trait Transport {
    /// Queue `data` for delivery on connection `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::SendFailed` if the transport cannot accept the bytes.
    fn send(&mut self, id: ConnectionId, data: &[u8]) -> Result<()>;

    /// Terminate connection `id`.
    fn close(&mut self, id: ConnectionId);
}

/// Transport that collects outbound bytes per connection.
///
/// An I/O driver drains it with [`BufferedTransport::take`] after each
/// dispatch and writes the bytes to the socket.
#[derive(Debug, Default)]
pub struct BufferedTransport {
    outbox: HashMap<ConnectionId, BytesMut>,
    closed: HashSet<ConnectionId>,
}

impl BufferedTransport {
    /// An empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes queued for `id` and not yet taken.
    #[must_use]
    pub fn pending(&self, id: ConnectionId) -> &[u8] {
        self.outbox.get(&id).map(|buf| &buf[..]).unwrap_or_default()
    }

    /// Drain the bytes queued for `id`.
    pub fn take(&mut self, id: ConnectionId) -> Bytes {
        self.outbox
            .get_mut(&id)
            .map(|buf| buf.split().freeze())
            .unwrap_or_default()
    }

    /// Whether `close` was called for `id`.
    #[must_use]
    pub fn is_closed(&self, id: ConnectionId) -> bool {
        self.closed.contains(&id)
    }

    /// Forget a previous close, for an identifier reused by a new connection.
    pub fn reopen(&mut self, id: ConnectionId) {
        self.closed.remove(&id);
        self.outbox.remove(&id);
    }
}

impl Transport for BufferedTransport {
    fn send(&mut self, id: ConnectionId, data: &[u8]) -> Result<()> {
        if self.closed.contains(&id) {
            return Err(Error::SendFailed {
                fd: id.get(),
                reason: "connection closed".into(),
            });
        }
        self.outbox.entry(id).or_default().extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self, id: ConnectionId) {
        self.closed.insert(id);
    }
}
