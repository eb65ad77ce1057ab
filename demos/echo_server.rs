//! WebSocket echo server.
//!
//! Run with: `RUST_LOG=debug cargo run --example echo_server`
//! Then connect any WebSocket client to `ws://127.0.0.1:9001`.
//!
//! Each accepted socket gets its own worker (connection table + outbox).
//! After every dispatch step the outbox is flushed to the socket. Control
//! frames are answered by the connection loop; only data frames reach the
//! message handler.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::{Bytes, BytesMut};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wsdispatch::{
    BufferedTransport, Config, ConnectionId, ConnectionMap, ConnectionTable, Frame, OpCode,
    Outbound, Server, WebSocketCodec, Worker,
};

const ADDR: &str = "127.0.0.1:9001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut server = Server::new(Config::default().with_server_name("wsdispatch-echo"));
    server.on_open(|_, event| {
        info!(connection_id = %event.connection_id, path = %event.request.path, "open");
        Ok(())
    })?;
    server.on_message(|out, frame| {
        let Some(id) = frame.connection_id else {
            return Ok(());
        };
        out.push(id, frame.payload(), frame.opcode, frame.finish)?;
        Ok(())
    })?;
    server.start()?;
    let server = Arc::new(server);

    let listener = TcpListener::bind(ADDR).await?;
    info!(addr = ADDR, "listening");

    let next_id = AtomicI64::new(1);
    loop {
        let (stream, addr) = listener.accept().await?;
        let id = ConnectionId::new(next_id.fetch_add(1, Ordering::Relaxed));
        info!(connection_id = %id, %addr, "accepted");

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&server, id, stream).await {
                warn!(connection_id = %id, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection(server: &Server, id: ConnectionId, stream: TcpStream) -> wsdispatch::Result<()> {
    let mut codec = WebSocketCodec::new(stream, server.config().limits);
    let mut worker = Worker::new(ConnectionMap::new(), BufferedTransport::new());
    worker.table_mut().accept(id);
    let dispatcher = server.dispatcher();

    let Some(request) = codec.read_handshake().await? else {
        return Ok(());
    };
    if !(request.is_upgrade() && server.websocket_enabled()) {
        let rejected = dispatcher.reject_request(&mut worker, id);
        codec.write_all(&worker.transport_mut().take(id)).await?;
        return rejected;
    }

    if let Some(conn) = worker.table_mut().get_mut(id) {
        conn.mark_handshaking();
    }
    let opened = dispatcher.handshake(&mut worker, id, request);
    codec.write_all(&worker.transport_mut().take(id)).await?;
    opened?;

    while !worker.transport().is_closed(id) {
        let Some(frame) = codec.read_frame().await? else {
            break;
        };
        match OpCode::from_u8(frame[0] & 0x0F) {
            Ok(OpCode::Ping) => {
                let ping = Server::unpack(&frame)?;
                codec.write_all(&control_frame(OpCode::Pong, ping.into_payload())?).await?;
                continue;
            }
            Ok(OpCode::Pong) => continue,
            Ok(OpCode::Close) => {
                // Echo the status code back, then stop reading.
                let close = Server::unpack(&frame)?;
                codec.write_all(&control_frame(OpCode::Close, close.into_payload())?).await?;
                worker.close(id);
                break;
            }
            _ => {}
        }
        let handled = dispatcher.receive(&mut worker, id, &frame);
        codec.write_all(&worker.transport_mut().take(id)).await?;
        if let Err(e) = handled {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(connection_id = %id, error = %e, "frame dropped");
        }
    }
    info!(connection_id = %id, "closed");
    Ok(())
}

fn control_frame(opcode: OpCode, payload: Bytes) -> wsdispatch::Result<BytesMut> {
    debug!(%opcode, len = payload.len(), "control frame");
    let mut buf = BytesMut::new();
    Frame::new(opcode.as_u8(), payload, true).write(&mut buf, None)?;
    Ok(buf)
}
