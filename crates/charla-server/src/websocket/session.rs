//! Per-connection session loop: split reader and writer tasks.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use charla_core::ConnectionId;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::connection::ClientConnection;
use super::handler::handle_frame;
use crate::server::AppState;

/// Run a WebSocket session until either side closes or the server shuts down.
pub async fn run_session(socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(state.config.max_send_queue);
    let conn = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
    state.connections.add(Arc::clone(&conn));
    info!(conn_id = %conn.id, connections = state.connections.count(), "client connected");

    // Cancels this session's pending replies; cancelled with the server too.
    let cancel = state.shutdown.child_token();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: drain the send queue, ping on every heartbeat, close on shutdown.
    let writer_conn = Arc::clone(&conn);
    let writer_cancel = cancel.clone();
    let heartbeat = state.config.heartbeat_interval;
    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(heartbeat);
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                () = writer_cancel.cancelled() => {
                    let _ = ws_tx.send(WsMessage::Close(None)).await;
                    break;
                }
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if ws_tx.send(WsMessage::Text(frame.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if !writer_conn.check_alive() {
                        warn!(conn_id = %writer_conn.id, "no pong since last heartbeat, closing");
                        let _ = ws_tx.send(WsMessage::Close(None)).await;
                        break;
                    }
                    if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    trace!(conn_id = %writer_conn.id, "sent ping");
                }
            }
        }
    });

    // Reader: dispatch frames and track liveness.
    let reader_conn = Arc::clone(&conn);
    let reader_cancel = cancel.clone();
    let responder = Arc::clone(&state.responder);
    let shutdown = Arc::clone(&state.shutdown);
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            reader_conn.mark_alive();
            match msg {
                WsMessage::Text(text) => {
                    if let Some(task) =
                        handle_frame(text.as_str(), &reader_conn, &responder, &reader_cancel)
                    {
                        shutdown.track(task);
                    }
                }
                WsMessage::Binary(_) => {
                    warn!(conn_id = %reader_conn.id, "ignoring binary frame");
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    cancel.cancel();
    let _ = state.connections.remove(&conn.id);
    debug!(conn_id = %conn.id, dropped = conn.drop_count(), age_ms = conn.age().as_millis(), "session ended");
    info!(conn_id = %conn.id, connections = state.connections.count(), "client disconnected");
}
