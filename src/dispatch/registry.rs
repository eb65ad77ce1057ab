//! Handler registry: at most one handler per websocket event.

use crate::dispatch::handler::{EventKind, Handler, MessageHandler, OpenHandler};

/// One slot per [`EventKind`]; empty slots hold no handler.
#[derive(Default)]
pub struct HandlerRegistry {
    open: Option<OpenHandler>,
    message: Option<MessageHandler>,
}

impl HandlerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handler` in its slot, returning the handler it replaced.
    pub fn set(&mut self, handler: Handler) -> Option<Handler> {
        match handler {
            Handler::Open(h) => self.open.replace(h).map(Handler::Open),
            Handler::Message(h) => self.message.replace(h).map(Handler::Message),
        }
    }

    /// The open handler, if registered.
    #[must_use]
    pub fn open(&self) -> Option<&OpenHandler> {
        self.open.as_ref()
    }

    /// The message handler, if registered.
    #[must_use]
    pub fn message(&self) -> Option<&MessageHandler> {
        self.message.as_ref()
    }

    /// Whether a handler is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Open => self.open.is_some(),
            EventKind::Message => self.message.is_some(),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("open", &self.open.is_some())
            .field("message", &self.message.is_some())
            .finish()
    }
}
