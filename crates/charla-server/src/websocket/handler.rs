//! Inbound frame dispatch.

use std::sync::Arc;

use charla_core::apology;
use charla_core::wire::{ClientEvent, ServerEvent};
use charla_responder::Responder;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Handle one text frame from a client.
///
/// A `user-message` spawns a reply task that emits a single `bot-message`
/// once the responder finishes, or an apology if it fails. The task stops
/// early if `cancel` fires.
/// Anything else is logged and ignored.
pub fn handle_frame(
    text: &str,
    conn: &Arc<ClientConnection>,
    responder: &Arc<dyn Responder>,
    cancel: &CancellationToken,
) -> Option<JoinHandle<()>> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(conn_id = %conn.id, error = %e, "ignoring malformed frame");
            return None;
        }
    };

    match event {
        ClientEvent::UserMessage(payload) => {
            debug!(conn_id = %conn.id, len = payload.message.len(), "user message received");
            let conn = Arc::clone(conn);
            let responder = Arc::clone(responder);
            let cancel = cancel.clone();
            Some(tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!(conn_id = %conn.id, "reply cancelled");
                    }
                    result = responder.respond(&payload.message) => {
                        let reply = result.unwrap_or_else(|e| {
                            warn!(conn_id = %conn.id, error = %e, "responder failed, sending apology");
                            apology::PROCESSING_FAILED.to_owned()
                        });
                        if !conn.send_event(&ServerEvent::bot_message(reply)) {
                            warn!(conn_id = %conn.id, "reply dropped, send queue full or closed");
                        }
                    }
                }
            }))
        }
    }
}
