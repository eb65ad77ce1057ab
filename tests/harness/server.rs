//! Drives one server-side connection over an async stream.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use wsdispatch::{
    ConnectionId, ConnectionTable, Error, Frame, OpCode, Result, Server, WebSocketCodec,
};

use super::{TestWorker, worker};

/// Run one connection to completion: handshake, then inbound frames until
/// the peer or a handler closes it.
///
/// Pings are answered with a pong here and never reach the handlers.
///
/// Returns the worker so tests can inspect the final connection state.
pub async fn serve<S>(server: &Server, id: ConnectionId, stream: S) -> Result<TestWorker>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = WebSocketCodec::new(stream, server.config().limits);
    let mut worker = worker();
    worker.table_mut().accept(id);
    worker.transport_mut().reopen(id);

    let Some(request) = codec.read_handshake().await? else {
        return Ok(worker);
    };

    let dispatcher = server.dispatcher();
    if !(request.is_upgrade() && server.websocket_enabled()) {
        let rejected = dispatcher.reject_request(&mut worker, id);
        codec.write_all(&worker.transport_mut().take(id)).await?;
        return rejected.map(|()| worker);
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
        if frame[0] & 0x0F == OpCode::Ping.as_u8() {
            let ping = Server::unpack(&frame)?;
            let mut pong = BytesMut::new();
            Frame::new(OpCode::Pong.as_u8(), ping.into_payload(), true).write(&mut pong, None)?;
            codec.write_all(&pong).await?;
            continue;
        }
        let handled = dispatcher.receive(&mut worker, id, &frame);
        codec.write_all(&worker.transport_mut().take(id)).await?;
        match handled {
            Ok(()) | Err(Error::HandlerFailed { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(worker)
}
