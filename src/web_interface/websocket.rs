//! The `/ws/traffic` subscriber loop.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use warp::ws::{Message, WebSocket};

use crate::controller::AppContext;

/// Serves one upgraded WebSocket until the client goes away.
///
/// The session is registered first, then the shared log source is started
/// (a no-op when it already runs) and the session's own scheduler is
/// spawned. A writer task drains the session queue into the socket so the
/// registry never waits on network I/O. Inbound frames carry nothing and are
/// ignored; a close frame, a transport error or the end of the stream ends
/// the session and cancels its tasks.
pub async fn serve_subscriber(socket: WebSocket, ctx: Arc<AppContext>) {
    let (mut sink, mut stream) = socket.split();
    let (session, mut outbound) = ctx.new_session();
    let id = session.id;
    let scheduler = ctx.scheduler_for(&session);

    ctx.registry.connect(session);
    if ctx.ensure_source_started() {
        info!("[{}] log event source started", id);
    }
    let scheduler = scheduler.spawn();

    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if let Err(e) = sink.send(Message::text(payload)).await {
                debug!("[{}] websocket send failed: {}", id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(message) if message.is_close() => break,
            Ok(_) => trace!("[{}] inbound message ignored", id),
            Err(e) => {
                warn!("[{}] websocket error: {}", id, e);
                break;
            }
        }
    }

    ctx.registry.disconnect(id);
    scheduler.abort();
    writer.abort();
    info!("[{}] subscriber session closed", id);
}
