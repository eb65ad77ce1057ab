//! # wsdispatch - Server-side WebSocket protocol layer
//!
//! `wsdispatch` upgrades established HTTP connections to WebSocket
//! connections and dispatches their events to application handlers.
//!
//! ## Features
//!
//! - **RFC 6455 handshake** computing the `101 Switching Protocols` answer
//! - **Frame codec** for encoding and decoding wire frames
//! - **Monotonic per-connection status** gating `push` and `exist`
//! - **One handler per event** for `open` and `message`
//! - **Explicit worker context** instead of process-wide state
//!
//! The event loop, socket I/O and HTTP parsing stay with the embedder,
//! which supplies a [`ConnectionTable`] and a [`Transport`]. With the
//! `async-tokio` feature, [`WebSocketCodec`] frames tokio streams.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsdispatch::{BufferedTransport, Config, ConnectionMap, Server, Worker};
//!
//! let mut server = Server::new(Config::default());
//! server.on_open(|_, event| {
//!     tracing::info!(connection_id = %event.connection_id, "opened");
//!     Ok(())
//! })?;
//! server.start()?;
//!
//! let mut worker = Worker::new(ConnectionMap::new(), BufferedTransport::new());
//! server.dispatcher().handshake(&mut worker, id, request)?;
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod worker;

#[cfg(feature = "async-tokio")]
pub mod codec;

pub use config::{Config, FailurePolicy, InboundFormat, Limits};
pub use connection::{
    Connection, ConnectionId, ConnectionMap, ConnectionTable, ProtocolStatus, STATUS_ACTIVE,
    STATUS_CONNECTION, STATUS_FRAME, STATUS_HANDSHAKE,
};
pub use dispatch::{Dispatcher, EventKind, Handler, HandlerError, HandlerResult, OpenEvent};
pub use error::{Error, Result};
pub use protocol::{
    Frame, HandshakeRequest, HandshakeResponse, OPCODE_BINARY, OPCODE_TEXT, OpCode, WS_GUID,
    compute_accept_key,
};
pub use server::{HttpEvents, HttpRegistrations, Server};
pub use transport::{BufferedTransport, Transport};
pub use worker::{Outbound, Worker};

#[cfg(feature = "async-tokio")]
pub use codec::WebSocketCodec;
