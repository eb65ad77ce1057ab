//! WebSocket protocol core (RFC 6455): handshake, framing and masking.

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::{Frame, decode, encode, frame_length};
pub use handshake::{
    HandshakeRequest, HandshakeResponse, WS_GUID, accept_response, bad_request_response,
    compute_accept_key,
};
pub use mask::{apply_mask, apply_mask_fast, generate_mask};
pub use opcode::{MAX_OPCODE, OPCODE_BINARY, OPCODE_TEXT, OpCode};
