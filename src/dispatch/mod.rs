//! Event dispatch.
//!
//! The [`Dispatcher`] drives a connection through its handshake and hands
//! decoded frames to the registered handlers. It holds no per-connection
//! state: everything connection-specific lives in the [`Worker`] passed to
//! each call, so one dispatcher can serve any number of workers.
//!
//! For a single connection the open handler always runs before any message
//! handler: messages are only dispatched once the connection is active, and
//! the connection becomes active in the same step that runs the open handler.

mod handler;
mod registry;

pub use handler::{
    EventKind, Handler, HandlerError, HandlerResult, MessageHandler, OpenEvent, OpenHandler,
};
pub use registry::HandlerRegistry;

use tracing::{debug, error, info, warn};

use crate::config::{Config, FailurePolicy, InboundFormat};
use crate::connection::{ConnectionId, ConnectionTable, ProtocolStatus};
use crate::error::{Error, Result};
use crate::protocol::{Frame, HandshakeRequest, accept_response, bad_request_response, decode};
use crate::transport::Transport;
use crate::worker::{Outbound, Worker};

/// Invokes registered handlers for one server.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: HandlerRegistry,
    config: Config,
}

impl Dispatcher {
    /// A dispatcher over `registry`, configured by `config`.
    #[must_use]
    pub fn new(config: Config, registry: HandlerRegistry) -> Self {
        Self { registry, config }
    }

    /// The handler registry.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether inbound frames need decoding at all.
    ///
    /// Without a message handler the collaborator may skip frame decoding.
    #[must_use]
    pub fn wants_messages(&self) -> bool {
        self.registry.contains(EventKind::Message)
    }

    /// Complete the opening handshake for connection `id`.
    ///
    /// Sends the `101 Switching Protocols` response, advances the connection
    /// to [`ProtocolStatus::Active`] and runs the open handler.
    ///
    /// # Errors
    ///
    /// - `Error::MissingHandshakeKey` if the request has no key; the
    ///   connection is closed and its status is left untouched
    /// - `Error::SendFailed` if the response cannot be sent; the connection
    ///   is closed
    /// - `Error::HandlerFailed` / `Error::Fatal` if the open handler fails
    pub fn handshake<C, T>(
        &self,
        worker: &mut Worker<C, T>,
        id: ConnectionId,
        request: HandshakeRequest,
    ) -> Result<()>
    where
        C: ConnectionTable,
        T: Transport,
    {
        let response = match accept_response(&request, &self.config.server_name) {
            Ok(response) => response,
            Err(e) => {
                warn!(connection_id = %id, error = %e, "handshake failed");
                worker.close(id);
                return Err(e);
            }
        };

        if let Err(e) = worker.transport_mut().send(id, &response) {
            warn!(connection_id = %id, error = %e, "handshake response not sent");
            worker.close(id);
            return Err(e);
        }
        debug!(connection_id = %id, path = %request.path, "handshake complete");

        let Some(conn) = worker.table_mut().get_mut(id) else {
            info!(connection_id = %id, "session is not exists, skipping open event");
            return Ok(());
        };
        conn.advance(ProtocolStatus::Active);

        let event = OpenEvent {
            connection_id: id,
            request,
        };
        self.dispatch_open(worker, &event)
    }

    /// Run the open handler, if one is registered.
    ///
    /// # Errors
    ///
    /// Returns the handler's failure mapped through the failure policy.
    pub fn dispatch_open(&self, out: &mut dyn Outbound, event: &OpenEvent) -> Result<()> {
        let Some(handler) = self.registry.open() else {
            return Ok(());
        };
        handler(out, event).map_err(|e| self.handler_failed(EventKind::Open, event.connection_id, e))
    }

    /// Run the message handler for one inbound frame, if one is registered.
    ///
    /// # Errors
    ///
    /// Returns the handler's failure mapped through the failure policy.
    pub fn dispatch_message(
        &self,
        out: &mut dyn Outbound,
        id: ConnectionId,
        frame: &Frame,
    ) -> Result<()> {
        let Some(handler) = self.registry.message() else {
            return Ok(());
        };
        debug!(connection_id = %id, opcode = frame.opcode, len = frame.payload.len(), finish = frame.finish, "dispatch message");
        handler(out, frame).map_err(|e| self.handler_failed(EventKind::Message, id, e))
    }

    /// Decode one complete inbound frame and dispatch it.
    ///
    /// `data` is a whole frame as delivered by the transport-framing
    /// collaborator, in the configured [`InboundFormat`]. Nothing is decoded
    /// when no message handler is registered.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConnection` if the connection has not completed its
    ///   handshake
    /// - `Error::FrameTooLarge` / `Error::MalformedFrame` if `data` cannot
    ///   be decoded
    /// - `Error::HandlerFailed` / `Error::Fatal` if the message handler fails
    pub fn receive<C, T>(&self, worker: &mut Worker<C, T>, id: ConnectionId, data: &[u8]) -> Result<()>
    where
        C: ConnectionTable,
        T: Transport,
    {
        if !self.wants_messages() {
            return Ok(());
        }
        if !worker.exist(id) {
            warn!(connection_id = %id, "frame from connection without completed handshake");
            return Err(Error::InvalidConnection(id.get()));
        }

        let frame = match self.config.inbound {
            InboundFormat::Wire => {
                self.config.limits.check_frame_size(data.len())?;
                decode(data)?
            }
            InboundFormat::Predecoded => Frame::parse_predecoded(data)?,
        };
        self.dispatch_message(worker, id, &frame.with_connection(id))
    }

    /// Answer a plain HTTP request with `400 Bad Request` and close.
    ///
    /// # Errors
    ///
    /// Returns `Error::SendFailed` if the response cannot be sent.
    pub fn reject_request<C, T>(&self, worker: &mut Worker<C, T>, id: ConnectionId) -> Result<()>
    where
        C: ConnectionTable,
        T: Transport,
    {
        debug!(connection_id = %id, "rejecting non-upgrade request");
        let response = bad_request_response(&self.config.server_name);
        let sent = worker.transport_mut().send(id, &response);
        worker.close(id);
        sent
    }

    fn handler_failed(&self, event: EventKind, id: ConnectionId, err: HandlerError) -> Error {
        error!(event = %event, connection_id = %id, reason = err.reason(), "handler failed");
        let fd = id.get();
        let reason = err.reason().to_owned();
        match self.config.failure_policy {
            FailurePolicy::Report => Error::HandlerFailed { event, fd, reason },
            FailurePolicy::Escalate => Error::Fatal { event, fd, reason },
        }
    }
}
