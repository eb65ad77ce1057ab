//! The public server surface.
//!
//! A [`Server`] is configured once (handlers registered with [`Server::on`]
//! and friends), then started. After [`Server::start`] the registry is
//! frozen and the server can be shared read-only between workers.
//!
//! ```rust,ignore
//! use wsdispatch::{Config, Handler, Server, OPCODE_TEXT};
//!
//! let mut server = Server::new(Config::default());
//! server.on_message(|out, frame| {
//!     if let Some(id) = frame.connection_id {
//!         out.push(id, &frame.payload, OPCODE_TEXT, true)?;
//!     }
//!     Ok(())
//! })?;
//! server.start()?;
//! ```

use std::collections::HashMap;

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::{ConnectionId, ConnectionTable};
use crate::dispatch::{
    Dispatcher, EventKind, Handler, HandlerRegistry, HandlerResult, OpenEvent,
};
use crate::error::{Error, Result};
use crate::protocol::opcode::check_opcode;
use crate::protocol::{Frame, decode, encode, generate_mask};
use crate::transport::Transport;
use crate::worker::{Outbound, Worker};

/// Registration surface of the HTTP layer underneath the websocket layer.
///
/// Event names other than `open` and `message` are forwarded here.
pub trait HttpEvents {
    /// Register `handler` for the HTTP-layer event `event`.
    ///
    /// # Errors
    ///
    /// Whatever the HTTP layer reports for the registration.
    fn on(&mut self, event: &str, handler: Handler) -> Result<()>;
}

/// [`HttpEvents`] that records forwarded registrations by lowercase name.
#[derive(Debug, Default)]
pub struct HttpRegistrations {
    handlers: HashMap<String, Handler>,
}

impl HttpRegistrations {
    /// No registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a handler was forwarded for `event`.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(&event.to_ascii_lowercase())
    }

    /// Number of forwarded registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nothing was forwarded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HttpEvents for HttpRegistrations {
    fn on(&mut self, event: &str, handler: Handler) -> Result<()> {
        self.handlers.insert(event.to_ascii_lowercase(), handler);
        Ok(())
    }
}

/// A websocket server: configuration, handler registry and run state.
pub struct Server {
    dispatcher: Dispatcher,
    running: bool,
    websocket_enabled: bool,
    http: Box<dyn HttpEvents + Send + Sync>,
}

impl Server {
    /// A stopped server with no handlers.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_http_events(config, HttpRegistrations::new())
    }

    /// A stopped server forwarding non-websocket registrations to `http`.
    #[must_use]
    pub fn with_http_events(config: Config, http: impl HttpEvents + Send + Sync + 'static) -> Self {
        Self {
            dispatcher: Dispatcher::new(config, HandlerRegistry::new()),
            running: false,
            websocket_enabled: false,
            http: Box::new(http),
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        self.dispatcher.config()
    }

    /// The dispatcher driving handshakes and messages.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Whether [`Server::start`] has been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether any handler has been registered through this server.
    ///
    /// Set by every accepted [`Server::on`] call, forwarded events included.
    /// The HTTP layer only treats upgrade requests when this is set.
    #[must_use]
    pub fn websocket_enabled(&self) -> bool {
        self.websocket_enabled
    }

    /// Register `handler` for the event called `event`.
    ///
    /// `open` and `message` (in any case) are stored here, replacing any
    /// earlier handler for the same event. Other names are forwarded to the
    /// HTTP layer.
    ///
    /// # Errors
    ///
    /// - `Error::ServerAlreadyRunning` once the server has started
    /// - `Error::NotCallable` if `handler` cannot take `event`'s arguments
    pub fn on(&mut self, event: &str, handler: Handler) -> Result<()> {
        if self.running {
            warn!(event, "Server is running. Unable to set event callback now.");
            return Err(Error::ServerAlreadyRunning);
        }

        let kind = EventKind::from_name(event);
        if kind.is_some_and(|kind| handler.kind() != kind) {
            warn!(event, handler = %handler.kind(), "handler is not callable for event");
            return Err(Error::NotCallable(event.to_owned()));
        }
        self.websocket_enabled = true;

        let Some(kind) = kind else {
            debug!(event, "forwarding registration to http layer");
            return self.http.on(event, handler);
        };
        if self.dispatcher.registry_mut().set(handler).is_some() {
            debug!(event = %kind, "replaced handler");
        }
        Ok(())
    }

    /// Register the open handler.
    ///
    /// # Errors
    ///
    /// `Error::ServerAlreadyRunning` once the server has started.
    pub fn on_open<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut dyn Outbound, &OpenEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(EventKind::Open.name(), Handler::open(f))
    }

    /// Register the message handler.
    ///
    /// # Errors
    ///
    /// `Error::ServerAlreadyRunning` once the server has started.
    pub fn on_message<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut dyn Outbound, &Frame) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(EventKind::Message.name(), Handler::message(f))
    }

    /// Enter the running state, freezing the handler registry.
    ///
    /// # Errors
    ///
    /// `Error::ServerAlreadyRunning` if called twice.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(Error::ServerAlreadyRunning);
        }
        self.running = true;
        info!(
            server_name = %self.config().server_name,
            registry = ?self.dispatcher.registry(),
            "server started"
        );
        Ok(())
    }

    /// Send one frame to connection `id` through `worker`.
    ///
    /// # Errors
    ///
    /// See [`Outbound::push`].
    pub fn push<C, T>(
        &self,
        worker: &mut Worker<C, T>,
        id: ConnectionId,
        data: &[u8],
        opcode: u8,
        finish: bool,
    ) -> Result<()>
    where
        C: ConnectionTable,
        T: Transport,
    {
        worker.push(id, data, opcode, finish)
    }

    /// Whether connection `id` is live and has completed its handshake.
    ///
    /// Always `false` before [`Server::start`].
    pub fn exist<C, T>(&self, worker: &Worker<C, T>, id: ConnectionId) -> bool
    where
        C: ConnectionTable,
        T: Transport,
    {
        if !self.running {
            warn!(connection_id = %id, "Server is not running.");
            return false;
        }
        worker.exist(id)
    }

    /// Encode a frame without sending it.
    ///
    /// With `mask` set a fresh random masking key is applied.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidOpcode` if `opcode > 10`
    /// - `Error::EmptyPayload` if `data` is empty
    pub fn pack(data: &[u8], opcode: u8, finish: bool, mask: bool) -> Result<BytesMut> {
        check_opcode(opcode)?;
        if data.is_empty() {
            return Err(Error::EmptyPayload);
        }
        encode(opcode, data, finish, mask.then(generate_mask))
    }

    /// Decode one frame from raw bytes.
    ///
    /// # Errors
    ///
    /// `Error::MalformedFrame` if the bytes do not hold a complete frame.
    pub fn unpack(data: &[u8]) -> Result<Frame> {
        decode(data)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("dispatcher", &self.dispatcher)
            .field("running", &self.running)
            .field("websocket_enabled", &self.websocket_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionMap, ProtocolStatus};
    use crate::protocol::{OPCODE_BINARY, OPCODE_TEXT};
    use crate::transport::BufferedTransport;

    #[test]
    fn test_on_sets_websocket_enabled() {
        let mut server = Server::default();
        assert!(!server.websocket_enabled());

        server.on("Open", Handler::open(|_, _| Ok(()))).unwrap();
        assert!(server.websocket_enabled());
        assert!(server.dispatcher().registry().contains(EventKind::Open));
    }

    #[test]
    fn test_on_after_start_is_rejected() {
        let mut server = Server::default();
        server.start().unwrap();

        assert_eq!(
            server.on_message(|_, _| Ok(())),
            Err(Error::ServerAlreadyRunning)
        );
        assert!(!server.dispatcher().registry().contains(EventKind::Message));
        assert!(!server.websocket_enabled());
    }

    #[test]
    fn test_on_mismatched_handler_not_callable() {
        let mut server = Server::default();
        assert_eq!(
            server.on("message", Handler::open(|_, _| Ok(()))),
            Err(Error::NotCallable("message".into()))
        );
        assert!(!server.websocket_enabled());
    }

    #[test]
    fn test_unknown_event_forwarded() {
        let mut server = Server::default();
        server.on("request", Handler::open(|_, _| Ok(()))).unwrap();
        assert!(server.websocket_enabled());
        assert!(!server.dispatcher().registry().contains(EventKind::Open));
    }

    #[test]
    fn test_start_twice() {
        let mut server = Server::default();
        server.start().unwrap();
        assert!(server.is_running());
        assert_eq!(server.start(), Err(Error::ServerAlreadyRunning));
    }

    #[test]
    fn test_exist_false_before_start() {
        let mut server = Server::default();
        let mut worker = Worker::new(ConnectionMap::new(), BufferedTransport::new());
        let id = ConnectionId::new(1);
        worker.table_mut().accept(id).advance(ProtocolStatus::Active);

        assert!(!server.exist(&worker, id));
        assert!(!server.exist(&worker, ConnectionId::new(2)));

        server.start().unwrap();
        assert!(server.exist(&worker, id));
        assert!(!server.exist(&worker, ConnectionId::new(2)));
    }

    #[test]
    fn test_pack() {
        let bytes = Server::pack(b"Hello", OPCODE_TEXT, true, false).unwrap();
        assert_eq!(&bytes[..], &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);

        let masked = Server::pack(b"Hello", OPCODE_BINARY, false, true).unwrap();
        assert_eq!(masked[0], 0x02);
        assert_eq!(masked[1], 0x85);
        assert_eq!(masked.len(), 11);
        assert_eq!(Server::unpack(&masked).unwrap().payload(), b"Hello");
    }

    #[test]
    fn test_pack_rejects_bad_arguments() {
        assert_eq!(
            Server::pack(b"x", 11, true, false),
            Err(Error::InvalidOpcode(11))
        );
        assert_eq!(
            Server::pack(b"", OPCODE_TEXT, true, false),
            Err(Error::EmptyPayload)
        );
    }

    #[test]
    fn test_unpack_malformed() {
        assert!(matches!(Server::unpack(&[0x81]), Err(Error::MalformedFrame(_))));
    }
}
