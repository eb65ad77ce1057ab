//! Error types for the WebSocket server layer.
//!
//! This module defines all error conditions that can occur while upgrading
//! connections, coding frames, registering handlers and dispatching events.

use thiserror::Error;

use crate::dispatch::EventKind;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Upgrade request carried no `Sec-WebSocket-Key` header.
    #[error("Handshake request has no Sec-WebSocket-Key header")]
    MissingHandshakeKey,

    /// Opcode above the pong value (0xA).
    #[error("Invalid opcode: {0} (max: 10)")]
    InvalidOpcode(u8),

    /// Outbound payload was empty.
    #[error("Payload is empty")]
    EmptyPayload,

    /// Connection id is not positive, unknown, or not websocket-capable.
    #[error("Connection {0} is not a websocket client")]
    InvalidConnection(i64),

    /// Handler registration attempted after the server started.
    #[error("Server is running, unable to set event handler now")]
    ServerAlreadyRunning,

    /// Handler cannot be invoked for the named event.
    #[error("Handler for event '{0}' is not callable")]
    NotCallable(String),

    /// Frame bytes could not be decoded.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Transport refused or failed to send bytes.
    #[error("Send to connection {fd} failed: {reason}")]
    SendFailed {
        /// Target connection.
        fd: i64,
        /// Transport-provided reason.
        reason: String,
    },

    /// A handler reported a failure while processing an event.
    #[error("{event} handler failed on connection {fd}: {reason}")]
    HandlerFailed {
        /// Event being dispatched.
        event: EventKind,
        /// Connection the event belonged to.
        fd: i64,
        /// Handler-provided reason.
        reason: String,
    },

    /// A handler failure escalated by `FailurePolicy::Escalate`.
    #[error("fatal {event} handler failure on connection {fd}: {reason}")]
    Fatal {
        /// Event being dispatched.
        event: EventKind,
        /// Connection the event belonged to.
        fd: i64,
        /// Handler-provided reason.
        reason: String,
    },

    /// Invalid HTTP upgrade request.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake request exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Actual handshake size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether this error must stop the embedding worker rather than just
    /// the current unit of work.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
