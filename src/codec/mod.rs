//! Transport framing over async streams.
//!
//! Buffers socket reads until a whole handshake request or a whole frame is
//! available, then hands it to the dispatcher.

mod framed;

pub use framed::WebSocketCodec;
