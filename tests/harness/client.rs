//! Raw WebSocket test client.
//!
//! Speaks just enough of the protocol to drive a server session: sends the
//! upgrade request and masked frames, reads the response head and frames.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use wsdispatch::protocol::{Frame, frame_length};

use super::{client_frame, raw_upgrade_request};

pub struct TestClient<S> {
    stream: S,
    buf: BytesMut,
}

impl<S: AsyncRead + AsyncWrite + Unpin> TestClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Send an upgrade request and return the response head.
    pub async fn handshake(&mut self, key: &str) -> String {
        self.send_raw(raw_upgrade_request(key).as_bytes()).await;
        self.read_head().await
    }

    pub async fn send_raw(&mut self, data: &[u8]) {
        self.stream.write_all(data).await.unwrap();
    }

    pub async fn send(&mut self, opcode: u8, payload: &[u8]) {
        self.send_raw(&client_frame(opcode, payload)).await;
    }

    /// Read everything up to and including the blank line ending a head.
    pub async fn read_head(&mut self) -> String {
        loop {
            if let Some(pos) = self.buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = self.buf.split_to(pos + 4);
                return String::from_utf8(head.to_vec()).unwrap();
            }
            self.fill().await;
        }
    }

    pub async fn recv(&mut self) -> Frame {
        loop {
            if let Some(len) = frame_length(&self.buf).unwrap() {
                if self.buf.len() >= len {
                    let (frame, consumed) = Frame::parse(&self.buf).unwrap();
                    self.buf.advance(consumed);
                    return frame;
                }
            }
            self.fill().await;
        }
    }

    /// Read until the server closes, returning whatever arrived.
    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut rest = self.buf.split().to_vec();
        self.stream.read_to_end(&mut rest).await.unwrap();
        rest
    }

    async fn fill(&mut self) {
        let n = self.stream.read_buf(&mut self.buf).await.unwrap();
        assert!(n > 0, "server closed the connection");
    }
}
