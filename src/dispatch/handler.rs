//! Application handler types.

use thiserror::Error;

use crate::connection::ConnectionId;
use crate::protocol::{Frame, HandshakeRequest};
use crate::worker::Outbound;

/// The websocket events this layer dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Handshake completed.
    Open,
    /// Inbound frame decoded.
    Message,
}

impl EventKind {
    /// Match an event name, ignoring case.
    ///
    /// Returns `None` for names this layer does not own.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("open") {
            Some(EventKind::Open)
        } else if name.eq_ignore_ascii_case("message") {
            Some(EventKind::Message)
        } else {
            None
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Message => "message",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure reported by an application handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct HandlerError {
    reason: String,
}

impl HandlerError {
    /// A failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The handler-provided reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<crate::Error> for HandlerError {
    fn from(err: crate::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Result returned by application handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Payload of the open event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    /// The connection that completed its handshake.
    pub connection_id: ConnectionId,
    /// The upgrade request it was opened with.
    pub request: HandshakeRequest,
}

/// Handler invoked once per connection after a successful handshake.
pub type OpenHandler = Box<dyn Fn(&mut dyn Outbound, &OpenEvent) -> HandlerResult + Send + Sync>;

/// Handler invoked once per inbound frame.
pub type MessageHandler = Box<dyn Fn(&mut dyn Outbound, &Frame) -> HandlerResult + Send + Sync>;

/// A handler ready for registration.
pub enum Handler {
    /// Handler taking [`OpenEvent`]s.
    Open(OpenHandler),
    /// Handler taking [`Frame`]s.
    Message(MessageHandler),
}

impl Handler {
    /// Wrap a closure as an open handler.
    pub fn open<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Outbound, &OpenEvent) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Open(Box::new(f))
    }

    /// Wrap a closure as a message handler.
    pub fn message<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Outbound, &Frame) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Message(Box::new(f))
    }

    /// The event this handler can be invoked for.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Handler::Open(_) => EventKind::Open,
            Handler::Message(_) => EventKind::Message,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}
