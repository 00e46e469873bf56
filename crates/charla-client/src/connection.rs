//! Connection Manager: owns the realtime connection and publishes its lifecycle.
//!
//! State machine (mode in brackets):
//!
//! ```text
//! Idle [fallback] ──initialize──▶ Connecting [fallback] ──handshake ok──▶ Open [realtime]
//!                                        │                                  │
//!                                        └── error / timeout ──▶ Failed ◀───┘ disconnect / error
//! any ──teardown──▶ Closed [fallback]
//! ```
//!
//! `Failed` is terminal for the attempt; nothing reconnects until
//! [`ConnectionManager::initialize`] is called again.

use std::sync::Arc;
use std::time::Duration;

use charla_core::wire::{ClientEvent, ServerEvent};
use charla_core::{ChatError, ConnectionId, Mode};
use charla_settings::ClientSettings;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle events kept for late subscribers.
const EVENT_CAPACITY: usize = 32;

/// Current state of the managed connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing attempted yet.
    Idle,
    /// Handshake in progress.
    Connecting {
        /// Attempt identity.
        id: ConnectionId,
    },
    /// Handshake completed; realtime delivery available.
    Open {
        /// Connection identity.
        id: ConnectionId,
    },
    /// Handshake failed or the open connection dropped.
    Failed {
        /// Identity of the failed attempt.
        id: ConnectionId,
        /// What went wrong.
        reason: String,
    },
    /// Torn down by the owner.
    Closed,
}

impl ConnectionState {
    /// Transport mode implied by this state.
    pub fn mode(&self) -> Mode {
        match self {
            Self::Open { .. } => Mode::Realtime,
            _ => Mode::Fallback,
        }
    }

    /// Identity of the current or last attempt, if any.
    pub fn id(&self) -> Option<&ConnectionId> {
        match self {
            Self::Connecting { id } | Self::Open { id } | Self::Failed { id, .. } => Some(id),
            Self::Idle | Self::Closed => None,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self, Self::Connecting { .. } | Self::Open { .. })
    }
}

/// Lifecycle notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Handshake completed.
    Connected {
        /// Connection identity.
        id: ConnectionId,
    },
    /// An open connection dropped.
    Disconnected {
        /// Connection identity.
        id: ConnectionId,
        /// What ended it.
        reason: String,
    },
    /// Handshake failed or timed out.
    ConnectError {
        /// Attempt identity.
        id: ConnectionId,
        /// What went wrong.
        reason: String,
    },
    /// Torn down by the owner.
    Closed,
}

/// Handle to an open realtime connection, shared by concurrent sends.
///
/// Cloning is cheap; all clones feed the same connection task.
#[derive(Clone, Debug)]
pub struct RealtimeLink {
    outbound: mpsc::Sender<ClientEvent>,
    inbound: broadcast::Sender<ServerEvent>,
    closed: CancellationToken,
}

impl RealtimeLink {
    /// Assemble a link from its channels.
    ///
    /// `closed` must be cancelled when the connection behind the channels ends.
    pub fn new(
        outbound: mpsc::Sender<ClientEvent>,
        inbound: broadcast::Sender<ServerEvent>,
        closed: CancellationToken,
    ) -> Self {
        Self {
            outbound,
            inbound,
            closed,
        }
    }

    /// Listen for server events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inbound.subscribe()
    }

    /// Queue an event for the connection task.
    pub async fn transmit(&self, event: ClientEvent) -> charla_core::Result<()> {
        if self.closed.is_cancelled() {
            return Err(ChatError::transport("realtime connection closed"));
        }
        self.outbound
            .send(event)
            .await
            .map_err(|_| ChatError::transport("realtime connection closed"))
    }

    /// Token cancelled when the connection ends.
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Whether the connection has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// What the dispatcher needs from a connection owner.
pub trait ModeSource: Send + Sync {
    /// Mode implied by the latest lifecycle event.
    fn current_mode(&self) -> Mode;
    /// The live link, when one is open.
    fn link(&self) -> Option<RealtimeLink>;
}

/// Connection parameters.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// `ws://` or `wss://` URL of the realtime endpoint.
    pub url: String,
    /// Handshake deadline.
    pub connect_timeout: Duration,
    /// Capacity of the outbound queue and the inbound event buffer.
    pub event_buffer: usize,
}

impl From<&ClientSettings> for ConnectionConfig {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            url: settings.socket_url(),
            connect_timeout: settings.connect_timeout(),
            event_buffer: settings.event_buffer.max(1),
        }
    }
}

/// State shared between the manager and its connection task.
///
/// Every transition takes the `link` lock first so the published state and
/// the link never disagree.
struct Shared {
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<LifecycleEvent>,
    link: Mutex<Option<RealtimeLink>>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state,
            events,
            link: Mutex::new(None),
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        let _ = self.events.send(event);
    }

    /// Enter `Connecting` unless an attempt is already active.
    fn begin(&self, id: &ConnectionId) -> bool {
        let _slot = self.link.lock();
        self.state.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            *state = ConnectionState::Connecting { id: id.clone() };
            true
        })
    }

    /// `Connecting{id}` → `Open{id}`. No-op if the attempt was superseded.
    fn open(&self, id: &ConnectionId, link: RealtimeLink) -> bool {
        let mut slot = self.link.lock();
        let opened = self.state.send_if_modified(|state| match state {
            ConnectionState::Connecting { id: current } if current == id => {
                *state = ConnectionState::Open { id: id.clone() };
                true
            }
            _ => false,
        });
        if opened {
            *slot = Some(link);
            drop(slot);
            info!(conn_id = %id, mode = %Mode::Realtime, "realtime connection open");
            self.emit(LifecycleEvent::Connected { id: id.clone() });
        }
        opened
    }

    /// Attempt `id` failed or dropped. No-op if it is no longer current.
    fn fail(&self, id: &ConnectionId, reason: String) {
        let mut slot = self.link.lock();
        let mut event = None;
        let _ = self.state.send_if_modified(|state| {
            event = match state {
                ConnectionState::Connecting { id: current } if current == id => {
                    Some(LifecycleEvent::ConnectError {
                        id: id.clone(),
                        reason: reason.clone(),
                    })
                }
                ConnectionState::Open { id: current } if current == id => {
                    Some(LifecycleEvent::Disconnected {
                        id: id.clone(),
                        reason: reason.clone(),
                    })
                }
                _ => None,
            };
            if event.is_none() {
                return false;
            }
            *state = ConnectionState::Failed {
                id: id.clone(),
                reason: reason.clone(),
            };
            true
        });
        let Some(event) = event else {
            debug!(conn_id = %id, "stale connection event ignored");
            return;
        };
        *slot = None;
        drop(slot);
        warn!(conn_id = %id, error = %reason, mode = %Mode::Fallback, "realtime connection unavailable");
        self.emit(event);
    }

    /// Any state → `Closed`.
    fn close(&self) {
        let mut slot = self.link.lock();
        *slot = None;
        let changed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Closed;
            true
        });
        drop(slot);
        if changed {
            info!("connection closed");
            self.emit(LifecycleEvent::Closed);
        }
    }
}

/// Owns the single realtime connection of a session.
pub struct ConnectionManager {
    config: ConnectionConfig,
    shared: Arc<Shared>,
    /// Cancels the current attempt and its connection task.
    attempt: Mutex<CancellationToken>,
}

impl ConnectionManager {
    /// Create an idle manager.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new()),
            attempt: Mutex::new(CancellationToken::new()),
        }
    }

    /// Open the realtime connection.
    ///
    /// Returns once the handshake resolves. A no-op while an attempt is
    /// connecting or open; after a failure or teardown it starts a new attempt.
    pub async fn initialize(&self) -> Mode {
        let id = ConnectionId::new();
        if !self.shared.begin(&id) {
            debug!("connection already active");
            return self.current_mode();
        }

        let cancel = CancellationToken::new();
        {
            let mut attempt = self.attempt.lock();
            attempt.cancel();
            *attempt = cancel.clone();
        }

        info!(conn_id = %id, url = %self.config.url, "connecting");
        let handshake =
            tokio::time::timeout(self.config.connect_timeout, connect_async(self.config.url.as_str()));
        let ws = tokio::select! {
            () = cancel.cancelled() => {
                debug!(conn_id = %id, "connect abandoned");
                return self.current_mode();
            }
            result = handshake => match result {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => {
                    self.shared.fail(&id, e.to_string());
                    return self.current_mode();
                }
                Err(_) => {
                    let ms = self.config.connect_timeout.as_millis();
                    self.shared.fail(&id, format!("handshake timed out after {ms}ms"));
                    return self.current_mode();
                }
            },
        };

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.event_buffer);
        let (inbound_tx, _) = broadcast::channel(self.config.event_buffer);
        let closed = cancel.child_token();
        let link = RealtimeLink::new(outbound_tx, inbound_tx.clone(), closed.clone());

        if self.shared.open(&id, link) {
            let task = ConnectionTask {
                id,
                outbound: outbound_rx,
                inbound: inbound_tx,
                cancel,
                closed,
                shared: Arc::clone(&self.shared),
            };
            let _ = tokio::spawn(task.run(ws));
        }
        self.current_mode()
    }

    /// Release the connection. Idempotent.
    pub fn teardown(&self) {
        self.attempt.lock().cancel();
        self.shared.close();
    }

    /// Mode implied by the latest lifecycle event.
    pub fn current_mode(&self) -> Mode {
        self.shared.state.borrow().mode()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Stream of lifecycle events from this point on.
    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.events.subscribe()
    }

    /// The live link, if the connection is open.
    pub fn link(&self) -> Option<RealtimeLink> {
        self.shared.link.lock().clone()
    }

    /// Connection parameters.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl ModeSource for ConnectionManager {
    fn current_mode(&self) -> Mode {
        ConnectionManager::current_mode(self)
    }

    fn link(&self) -> Option<RealtimeLink> {
        ConnectionManager::link(self)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.attempt.get_mut().cancel();
        self.shared.close();
    }
}

/// The task that owns the socket of one open connection.
struct ConnectionTask {
    id: ConnectionId,
    outbound: mpsc::Receiver<ClientEvent>,
    inbound: broadcast::Sender<ServerEvent>,
    cancel: CancellationToken,
    closed: CancellationToken,
    shared: Arc<Shared>,
}

impl ConnectionTask {
    async fn run(mut self, ws: WsStream) {
        let _closed = self.closed.clone().drop_guard();
        let (mut ws_tx, mut ws_rx) = ws.split();

        let reason = loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = ws_tx.send(WsMessage::Close(None)).await;
                    debug!(conn_id = %self.id, "connection task stopped");
                    return;
                }
                event = self.outbound.recv() => {
                    let Some(event) = event else {
                        break "outbound queue closed".to_string();
                    };
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(conn_id = %self.id, error = %e, "failed to serialize frame");
                            continue;
                        }
                    };
                    if let Err(e) = ws_tx.send(WsMessage::Text(frame.into())).await {
                        break format!("send failed: {e}");
                    }
                }
                msg = ws_rx.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(event) => {
                                let _ = self.inbound.send(event);
                            }
                            Err(e) => {
                                warn!(conn_id = %self.id, error = %e, "ignoring malformed frame");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => break "closed by server".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "connection reset".to_string(),
                },
            }
        };

        self.closed.cancel();
        self.shared.fail(&self.id, reason);
    }
}
