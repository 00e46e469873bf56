//! Request Correlator: one realtime request, one resolution.
//!
//! Replies on the wire carry no request key, so correlation is single-slot:
//! each call subscribes to inbound events *before* transmitting and takes the
//! first `bot-message` that follows. This holds while each call has at most
//! one message in flight; concurrent calls on one connection may receive each
//! other's replies. Multiplexing would need a key on the wire and a
//! key → slot map in place of the per-call subscription.

use std::time::Duration;

use charla_core::wire::{ClientEvent, ServerEvent};
use charla_core::{ChatError, CorrelationKey, Message, Mode, Reply};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::RealtimeLink;

/// Sends messages over a [`RealtimeLink`] and awaits the matching reply.
#[derive(Clone, Debug)]
pub struct RequestCorrelator {
    timeout: Duration,
}

impl RequestCorrelator {
    /// Correlator resolving with a timeout apology after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Reply deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `message` and wait for its reply. Never fails: errors become apologies.
    pub async fn send(&self, message: &Message, link: &RealtimeLink) -> Reply {
        let key = CorrelationKey::next();
        match self.deliver(key, message, link).await {
            Ok(text) => {
                debug!(correlation = %key, mode = %Mode::Realtime, "reply received");
                Reply::bot(text, Mode::Realtime)
            }
            Err(e) => {
                warn!(correlation = %key, mode = %Mode::Realtime, error = %e, kind = %e.kind(), "realtime delivery failed");
                Reply::apology(&e)
            }
        }
    }

    /// Arm, transmit, and race the deadline against the first reply.
    pub async fn deliver(
        &self,
        key: CorrelationKey,
        message: &Message,
        link: &RealtimeLink,
    ) -> charla_core::Result<String> {
        let pending = PendingRequest::arm(key, link, self.timeout);
        debug!(correlation = %key, timeout_ms = pending.timeout_ms(), "request armed");

        let event = ClientEvent::user_message(message.text());
        match tokio::time::timeout_at(pending.deadline, link.transmit(event)).await {
            Ok(sent) => sent?,
            Err(_) => return Err(pending.timed_out()),
        }

        pending.resolve().await
    }
}

/// One in-flight realtime request.
///
/// Dropping it (on either resolution path) drops the subscription, so a reply
/// arriving afterwards has nowhere to go.
#[derive(Debug)]
pub struct PendingRequest {
    key: CorrelationKey,
    deadline: Instant,
    timeout: Duration,
    slot: broadcast::Receiver<ServerEvent>,
    closed: CancellationToken,
}

impl PendingRequest {
    /// Subscribe to replies and fix the deadline.
    pub fn arm(key: CorrelationKey, link: &RealtimeLink, timeout: Duration) -> Self {
        Self {
            key,
            deadline: Instant::now() + timeout,
            timeout,
            slot: link.subscribe(),
            closed: link.closed_token(),
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn timed_out(&self) -> ChatError {
        ChatError::TransportTimeout {
            timeout_ms: self.timeout_ms(),
        }
    }

    /// Wait for the first reply or the deadline, whichever comes first.
    ///
    /// The deadline is polled first, so a reply that is ready at the same
    /// instant loses to the timeout.
    pub async fn resolve(mut self) -> charla_core::Result<String> {
        let expired = tokio::time::sleep_until(self.deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;
                () = &mut expired => return Err(self.timed_out()),
                received = self.slot.recv() => match received {
                    Ok(ServerEvent::BotMessage(payload)) => {
                        if payload.message.trim().is_empty() {
                            return Err(ChatError::responder("empty reply"));
                        }
                        return Ok(payload.message);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(correlation = %self.key, skipped, "reply buffer lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(ChatError::transport("realtime connection closed before reply"));
                    }
                },
                () = self.closed.cancelled() => {
                    return Err(ChatError::transport("realtime connection closed before reply"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use charla_core::apology;
    use charla_core::{ErrorKind, ReplySource};
    use tokio::sync::mpsc;

    struct FakePeer {
        outbound: mpsc::Receiver<ClientEvent>,
        inbound: broadcast::Sender<ServerEvent>,
        closed: CancellationToken,
    }

    fn fake_link(buffer: usize) -> (RealtimeLink, FakePeer) {
        let (out_tx, out_rx) = mpsc::channel(buffer);
        let (in_tx, _) = broadcast::channel(buffer);
        let closed = CancellationToken::new();
        let link = RealtimeLink::new(out_tx, in_tx.clone(), closed.clone());
        (
            link,
            FakePeer {
                outbound: out_rx,
                inbound: in_tx,
                closed,
            },
        )
    }

    /// Answer the next user message after `delay` with `reply`.
    fn answer_after(mut peer: FakePeer, delay: Duration, reply: &'static str) -> tokio::task::JoinHandle<FakePeer> {
        tokio::spawn(async move {
            let _ = peer.outbound.recv().await;
            tokio::time::sleep(delay).await;
            let _ = peer.inbound.send(ServerEvent::bot_message(reply));
            peer
        })
    }

    fn msg(text: &str) -> Message {
        Message::parse(text).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn reply_before_deadline_resolves_with_reply() {
        let (link, peer) = fake_link(4);
        let _peer = answer_after(peer, Duration::from_millis(1_500), "¡Hola!");

        let reply = RequestCorrelator::new(Duration::from_secs(10))
            .send(&msg("hola"), &link)
            .await;
        assert_eq!(reply.text(), "¡Hola!");
        assert_eq!(reply.source(), ReplySource::Bot(Mode::Realtime));
    }

    #[tokio::test(start_paused = true)]
    async fn silence_resolves_with_timeout_apology() {
        let (link, _peer) = fake_link(4);
        let started = Instant::now();

        let reply = RequestCorrelator::new(Duration::from_secs(10))
            .send(&msg("hola"), &link)
            .await;
        assert_eq!(reply.text(), apology::TIMED_OUT);
        assert_eq!(reply.source(), ReplySource::Apology(ErrorKind::TransportTimeout));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_millis(10_100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_late_reply_is_a_no_op() {
        let (link, peer) = fake_link(4);
        let answered = answer_after(peer, Duration::from_millis(1), "tarde");

        let reply = RequestCorrelator::new(Duration::ZERO)
            .send(&msg("hola"), &link)
            .await;
        assert_eq!(reply.text(), apology::TIMED_OUT);

        // the late reply finds no subscriber
        let peer = answered.await.unwrap();
        assert_eq!(peer.inbound.receiver_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tie_goes_to_timeout() {
        let (link, peer) = fake_link(4);
        let pending = PendingRequest::arm(CorrelationKey::next(), &link, Duration::ZERO);
        // reply already buffered when resolution starts
        let _ = peer.inbound.send(ServerEvent::bot_message("a tiempo"));
        assert_matches!(
            pending.resolve().await,
            Err(ChatError::TransportTimeout { timeout_ms: 0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reply_sent_before_arming_is_not_seen() {
        let (link, peer) = fake_link(4);
        let _ = peer.inbound.send(ServerEvent::bot_message("viejo"));
        let pending = PendingRequest::arm(CorrelationKey::next(), &link, Duration::from_secs(1));
        let _ = peer.inbound.send(ServerEvent::bot_message("nuevo"));
        assert_eq!(pending.resolve().await.unwrap(), "nuevo");
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_dropped_after_resolution() {
        let (link, peer) = fake_link(4);
        let peer_task = answer_after(peer, Duration::from_millis(10), "ok");
        let reply = RequestCorrelator::new(Duration::from_secs(1))
            .send(&msg("hola"), &link)
            .await;
        assert_eq!(reply.text(), "ok");
        let peer = peer_task.await.unwrap();
        assert_eq!(peer.inbound.receiver_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_loss_is_transport_error() {
        let (link, peer) = fake_link(4);
        let _ = tokio::spawn(async move {
            let mut peer = peer;
            let _ = peer.outbound.recv().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
            peer.closed.cancel();
        });

        let result = RequestCorrelator::new(Duration::from_secs(10))
            .deliver(CorrelationKey::next(), &msg("hola"), &link)
            .await;
        assert_matches!(result, Err(ChatError::Transport { .. }));
    }

    #[tokio::test]
    async fn closed_link_fails_fast() {
        let (link, peer) = fake_link(4);
        peer.closed.cancel();
        let reply = RequestCorrelator::new(Duration::from_secs(10))
            .send(&msg("hola"), &link)
            .await;
        assert_eq!(reply.text(), apology::PROCESSING_FAILED);
        assert_eq!(reply.source(), ReplySource::Apology(ErrorKind::Transport));
    }

    #[tokio::test(start_paused = true)]
    async fn full_outbound_queue_counts_against_deadline() {
        let (link, _peer) = fake_link(1);
        link.transmit(ClientEvent::user_message("relleno")).await.unwrap();

        let result = RequestCorrelator::new(Duration::from_secs(2))
            .deliver(CorrelationKey::next(), &msg("hola"), &link)
            .await;
        assert_matches!(result, Err(ChatError::TransportTimeout { timeout_ms: 2_000 }));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_reply_is_responder_error() {
        let (link, peer) = fake_link(4);
        let _peer = answer_after(peer, Duration::from_millis(5), "   ");
        let result = RequestCorrelator::new(Duration::from_secs(1))
            .deliver(CorrelationKey::next(), &msg("hola"), &link)
            .await;
        assert_matches!(result, Err(ChatError::Responder { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_each_resolve_once() {
        let (link, mut peer) = fake_link(8);
        let responder = tokio::spawn(async move {
            for _ in 0..2 {
                let _ = peer.outbound.recv().await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = peer.inbound.send(ServerEvent::bot_message("uno"));
            let _ = peer.inbound.send(ServerEvent::bot_message("dos"));
            peer
        });

        let correlator = RequestCorrelator::new(Duration::from_secs(5));
        let (ma, mb) = (msg("a"), msg("b"));
        let (a, b) = tokio::join!(correlator.send(&ma, &link), correlator.send(&mb, &link));
        // single-slot: both take the first reply after their own transmit
        assert_eq!(a.text(), "uno");
        assert_eq!(b.text(), "uno");
        let peer = responder.await.unwrap();
        assert_eq!(peer.inbound.receiver_count(), 0);
    }
}
