//! WebSocket frame encoding and decoding (RFC 6455 Section 5.2).
//!
//! The codec is pure: it never touches a connection or a socket. Callers
//! hand it one complete frame; accumulating bytes across socket reads until
//! [`frame_length`] reports a full frame is the transport's job.

use bytes::{BufMut, Bytes, BytesMut};

use crate::connection::ConnectionId;
use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::opcode::{OPCODE_BINARY, OPCODE_TEXT, check_opcode};

/// Largest payload length expressible in the 7-bit length field.
pub const MAX_SHORT_PAYLOAD: usize = 125;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const OPCODE_BITS: u8 = 0x0F;
const LENGTH_BITS: u8 = 0x7F;
const LENGTH_16: u8 = 126;
const LENGTH_64: u8 = 127;

#[derive(Debug, Clone)]
struct FrameHeader {
    finish: bool,
    opcode: u8,
    mask: Option<[u8; 4]>,
    payload_len: usize,
    header_len: usize,
}

/// Parse a frame header.
///
/// Returns `Ok(None)` while `buf` is too short to hold the whole header
/// (length extension and mask key included).
///
/// # Errors
///
/// - `Error::MalformedFrame` if the 64-bit length sets its most significant
///   bit, or does not fit in `usize`
fn parse_header(buf: &[u8]) -> Result<Option<FrameHeader>> {
    if buf.len() < 2 {
        return Ok(None);
    }

    let byte0 = buf[0];
    let byte1 = buf[1];

    let finish = (byte0 & FIN_BIT) != 0;
    let opcode = byte0 & OPCODE_BITS;
    let masked = (byte1 & MASK_BIT) != 0;

    let (payload_len, len_size) = match byte1 & LENGTH_BITS {
        LENGTH_16 => {
            if buf.len() < 4 {
                return Ok(None);
            }
            (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
        }
        LENGTH_64 => {
            if buf.len() < 10 {
                return Ok(None);
            }
            let len_u64 = u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]);
            if len_u64 & (1 << 63) != 0 {
                return Err(Error::MalformedFrame(
                    "64-bit payload length has the most significant bit set".into(),
                ));
            }
            let len = usize::try_from(len_u64).map_err(|_| {
                Error::MalformedFrame(format!("payload length {len_u64} exceeds platform limit"))
            })?;
            (len, 10)
        }
        short => (short as usize, 2),
    };

    let header_len = if masked { len_size + 4 } else { len_size };
    if buf.len() < header_len {
        return Ok(None);
    }

    let mask = masked.then(|| {
        [
            buf[len_size],
            buf[len_size + 1],
            buf[len_size + 2],
            buf[len_size + 3],
        ]
    });

    Ok(Some(FrameHeader {
        finish,
        opcode,
        mask,
        payload_len,
        header_len,
    }))
}

/// Number of bytes the frame at the start of `buf` occupies on the wire.
///
/// Returns `Ok(None)` until enough of the header has arrived to know it.
/// The returned length may exceed `buf.len()`; the frame is complete once
/// `buf.len() >= length`.
///
/// # Errors
///
/// - `Error::MalformedFrame` for a non-representable 64-bit length
pub fn frame_length(buf: &[u8]) -> Result<Option<usize>> {
    let Some(header) = parse_header(buf)? else {
        return Ok(None);
    };
    header
        .header_len
        .checked_add(header.payload_len)
        .map(Some)
        .ok_or_else(|| Error::MalformedFrame("frame length overflows usize".into()))
}

/// Header bytes needed for a payload of `payload_len`.
#[inline]
#[must_use]
pub const fn header_size(payload_len: usize, masked: bool) -> usize {
    let extended = if payload_len <= MAX_SHORT_PAYLOAD {
        0
    } else if payload_len <= u16::MAX as usize {
        2
    } else {
        8
    };
    2 + extended + if masked { 4 } else { 0 }
}

/// Encode one frame.
///
/// With `mask = Some(key)` the mask bit is set, the key follows the length
/// field and the payload is XORed against it.
///
/// # Errors
///
/// - `Error::InvalidOpcode` if `opcode > 10`; nothing is written
pub fn encode(opcode: u8, payload: &[u8], finish: bool, mask: Option<[u8; 4]>) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(header_size(payload.len(), mask.is_some()) + payload.len());
    encode_into(&mut buf, opcode, payload, finish, mask)?;
    Ok(buf)
}

/// Encode one frame, appending to `buf`.
///
/// # Errors
///
/// - `Error::InvalidOpcode` if `opcode > 10`; `buf` is left untouched
pub fn encode_into(
    buf: &mut BytesMut,
    opcode: u8,
    payload: &[u8],
    finish: bool,
    mask: Option<[u8; 4]>,
) -> Result<()> {
    check_opcode(opcode)?;

    let payload_len = payload.len();
    buf.reserve(header_size(payload_len, mask.is_some()) + payload_len);

    let byte0 = if finish { FIN_BIT | opcode } else { opcode };
    buf.put_u8(byte0);

    let mask_flag = if mask.is_some() { MASK_BIT } else { 0 };
    if payload_len <= MAX_SHORT_PAYLOAD {
        buf.put_u8(mask_flag | payload_len as u8);
    } else if payload_len <= u16::MAX as usize {
        buf.put_u8(mask_flag | LENGTH_16);
        buf.put_u16(payload_len as u16);
    } else {
        buf.put_u8(mask_flag | LENGTH_64);
        buf.put_u64(payload_len as u64);
    }

    match mask {
        Some(key) => {
            buf.put_slice(&key);
            let start = buf.len();
            buf.put_slice(payload);
            apply_mask_fast(&mut buf[start..], key);
        }
        None => buf.put_slice(payload),
    }

    Ok(())
}

/// Decode one complete frame from the start of `buf`.
///
/// Bytes after the frame are ignored.
///
/// # Errors
///
/// - `Error::MalformedFrame` if the header, mask key or payload is truncated,
///   or the 64-bit length is not representable
pub fn decode(buf: &[u8]) -> Result<Frame> {
    Frame::parse(buf).map(|(frame, _)| frame)
}

/// A WebSocket frame as seen by application handlers.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                 Masking key (if MASK set)                     |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// The opcode is kept as the raw 4-bit value; [`Frame::op_code`] maps it to
/// a named [`OpCode`] when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Connection the frame arrived on; `None` for frames from [`decode`].
    pub connection_id: Option<ConnectionId>,
    /// Final fragment flag.
    pub finish: bool,
    /// Raw opcode nibble (0-15).
    pub opcode: u8,
    /// Unmasked payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub fn new(opcode: u8, payload: impl Into<Bytes>, finish: bool) -> Self {
        Self {
            connection_id: None,
            finish,
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self::new(OPCODE_TEXT, data, true)
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(OPCODE_BINARY, data, true)
    }

    /// Attach the connection the frame belongs to.
    #[must_use]
    pub fn with_connection(mut self, id: ConnectionId) -> Self {
        self.connection_id = Some(id);
        self
    }

    /// The named opcode, if the raw value has one.
    #[must_use]
    pub fn op_code(&self) -> Option<OpCode> {
        OpCode::from_u8(self.opcode).ok()
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Parse a frame from a buffer holding at least one complete frame.
    ///
    /// Returns the parsed frame and the number of bytes consumed.
    ///
    /// ## Errors
    ///
    /// - `Error::MalformedFrame` if the frame is truncated or its 64-bit
    ///   length is not representable
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = parse_header(buf)?.ok_or_else(|| {
            Error::MalformedFrame(format!("header truncated at {} bytes", buf.len()))
        })?;

        let payload_start = header.header_len;
        let available = buf.len() - payload_start;
        if available < header.payload_len {
            return Err(Error::MalformedFrame(format!(
                "payload truncated: declared {} bytes, have {}",
                header.payload_len, available
            )));
        }
        let payload_end = payload_start + header.payload_len;

        let mut data = buf[payload_start..payload_end].to_vec();
        if let Some(mask) = header.mask {
            apply_mask_fast(&mut data, mask);
        }

        let frame = Frame {
            connection_id: None,
            finish: header.finish,
            opcode: header.opcode,
            payload: Bytes::from(data),
        };

        Ok((frame, payload_end))
    }

    /// Build a frame from bytes the transport already decoded.
    ///
    /// Layout: byte 0 is the finish flag (non-zero = final), byte 1 the
    /// opcode, the rest the unmasked payload.
    ///
    /// ## Errors
    ///
    /// - `Error::MalformedFrame` if fewer than two bytes are given or the
    ///   opcode byte does not fit in four bits
    pub fn parse_predecoded(buf: &[u8]) -> Result<Self> {
        let [finish, opcode, payload @ ..] = buf else {
            return Err(Error::MalformedFrame(format!(
                "predecoded frame needs 2 header bytes, have {}",
                buf.len()
            )));
        };
        if *opcode > OPCODE_BITS {
            return Err(Error::MalformedFrame(format!(
                "predecoded opcode {opcode} out of range"
            )));
        }
        Ok(Self::new(*opcode, Bytes::copy_from_slice(payload), *finish != 0))
    }

    /// Write the frame, appending to `buf`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidOpcode` if the opcode is above 10
    pub fn write(&self, buf: &mut BytesMut, mask: Option<[u8; 4]>) -> Result<()> {
        encode_into(buf, self.opcode, &self.payload, self.finish, mask)
    }
}
