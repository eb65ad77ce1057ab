use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::frame::MAX_SHORT_PAYLOAD;
use crate::protocol::{HandshakeRequest, OpCode, frame_length};

const READ_CHUNK: usize = 4096;
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Accumulates bytes from an async stream until a complete handshake
/// request or a complete frame is buffered.
///
/// Frames are returned as raw wire bytes so the dispatcher decodes each one
/// exactly once.
pub struct WebSocketCodec<T> {
    io: T,
    read_buf: BytesMut,
    limits: Limits,
}

impl<T> WebSocketCodec<T> {
    #[must_use]
    pub fn new(io: T, limits: Limits) -> Self {
        Self {
            io,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            limits,
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.io
    }

    /// Bytes read from the stream but not yet returned.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.read_buf
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> WebSocketCodec<T> {
    /// Read the HTTP request head that opens a connection.
    ///
    /// Returns `Ok(None)` if the peer closed before sending anything.
    /// Bytes following the request head stay buffered for
    /// [`WebSocketCodec::read_frame`].
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` if no complete head fits in the limit
    /// - `Error::InvalidHandshake` if the head cannot be parsed, or the
    ///   peer closed mid-request
    /// - `Error::Io` on read failure
    pub async fn read_handshake(&mut self) -> Result<Option<HandshakeRequest>> {
        loop {
            if let Some(pos) = find_header_end(&self.read_buf) {
                let head = self.read_buf.split_to(pos + HEADER_END.len());
                return HandshakeRequest::parse_with_limit(&head, &self.limits).map(Some);
            }
            self.limits.check_handshake_size(self.read_buf.len())?;

            if self.fill().await? == 0 {
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::InvalidHandshake(
                    "connection closed mid-request".into(),
                ));
            }
        }
    }

    /// Read one complete frame as raw wire bytes.
    ///
    /// Returns `Ok(None)` on a clean close between frames.
    ///
    /// # Errors
    ///
    /// - `Error::FrameTooLarge` as soon as the header declares a frame
    ///   above the limit
    /// - `Error::MalformedFrame` for a non-representable length, a
    ///   fragmented or oversized control frame, or a peer closing mid-frame
    /// - `Error::Io` on read failure
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(len) = frame_length(&self.read_buf)? {
                check_control_frame(&self.read_buf)?;
                self.limits.check_frame_size(len)?;
                if self.read_buf.len() >= len {
                    trace!(len, "frame buffered");
                    return Ok(Some(self.read_buf.split_to(len).freeze()));
                }
            }

            if self.fill().await? == 0 {
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::MalformedFrame(format!(
                    "connection closed with {} bytes of a partial frame",
                    self.read_buf.len()
                )));
            }
        }
    }

    /// Write `data` to the stream and flush it.
    ///
    /// # Errors
    ///
    /// `Error::Io` on write failure.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.io.write_all(data).await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn fill(&mut self) -> Result<usize> {
        self.read_buf.reserve(READ_CHUNK);
        let n = self.io.read_buf(&mut self.read_buf).await?;
        Ok(n)
    }
}

/// Control frames must be final and carry at most 125 payload bytes.
fn check_control_frame(header: &[u8]) -> Result<()> {
    let Ok(opcode) = OpCode::from_u8(header[0] & 0x0F) else {
        return Ok(());
    };
    if !opcode.is_control() {
        return Ok(());
    }
    if header[0] & 0x80 == 0 {
        return Err(Error::MalformedFrame(format!(
            "fragmented {} frame",
            opcode.name()
        )));
    }
    let len = usize::from(header[1] & 0x7F);
    if len > MAX_SHORT_PAYLOAD {
        return Err(Error::MalformedFrame(format!(
            "{} frame payload exceeds {MAX_SHORT_PAYLOAD} bytes",
            opcode.name()
        )));
    }
    Ok(())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_END.len())
        .position(|window| window == HEADER_END)
}
