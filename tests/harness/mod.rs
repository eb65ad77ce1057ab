//! Shared helpers for the integration tests.
//!
//! Provides event recording handlers, a raw tokio test client and a
//! per-connection session driver wiring the codec to the dispatcher.

#![allow(dead_code)]

mod client;
mod server;

use std::sync::{Arc, Mutex};

pub use client::TestClient;
pub use server::serve;

use wsdispatch::connection::ConnectionMap;
use wsdispatch::protocol::encode;
use wsdispatch::{BufferedTransport, ConnectionId, HandshakeRequest, Server, Worker};

pub type TestWorker = Worker<ConnectionMap, BufferedTransport>;

/// Event observed by a recording handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(i64),
    Message { fd: i64, opcode: u8, payload: Vec<u8> },
}

/// Log shared between recording handlers and the test body.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Register recording open and message handlers on `server`.
    pub fn install(&self, server: &mut Server) {
        let log = Arc::clone(&self.events);
        server
            .on_open(move |_, event| {
                log.lock().unwrap().push(Event::Open(event.connection_id.get()));
                Ok(())
            })
            .unwrap();

        let log = Arc::clone(&self.events);
        server
            .on_message(move |_, frame| {
                let fd = frame.connection_id.map_or(0, ConnectionId::get);
                log.lock().unwrap().push(Event::Message {
                    fd,
                    opcode: frame.opcode,
                    payload: frame.payload().to_vec(),
                });
                Ok(())
            })
            .unwrap();
    }
}

pub fn id(raw: i64) -> ConnectionId {
    ConnectionId::new(raw)
}

pub fn worker() -> TestWorker {
    Worker::new(ConnectionMap::new(), BufferedTransport::new())
}

/// Register `raw` as a connection whose upgrade request was recognized.
pub fn handshaking(worker: &mut TestWorker, raw: i64) -> ConnectionId {
    worker.table_mut().accept(id(raw)).mark_handshaking();
    id(raw)
}

pub fn upgrade_request(key: &str) -> HandshakeRequest {
    HandshakeRequest::from_headers([
        ("Host", "localhost"),
        ("Upgrade", "websocket"),
        ("Connection", "Upgrade"),
        ("Sec-WebSocket-Key", key),
        ("Sec-WebSocket-Version", "13"),
    ])
    .with_path("/chat")
}

pub fn raw_upgrade_request(key: &str) -> String {
    format!(
        "GET /chat HTTP/1.1\r\n\
         Host: localhost\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n"
    )
}

/// A masked frame as a client sends it.
pub fn client_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    encode(opcode, payload, true, Some([0x37, 0xfa, 0x21, 0x3d]))
        .unwrap()
        .to_vec()
}
