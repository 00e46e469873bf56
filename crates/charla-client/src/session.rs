//! `ChatClient`: a session bundling the Connection Manager and the Dispatcher.

use std::sync::Arc;

use charla_core::{Mode, Reply};
use charla_settings::ClientSettings;
use tracing::info;

use crate::connection::{ConnectionConfig, ConnectionManager, ModeSource};
use crate::correlator::RequestCorrelator;
use crate::dispatcher::Dispatcher;
use crate::fallback::{FallbackCaller, FallbackTransport, HttpFallback};

/// One chat session against a Charla server.
pub struct ChatClient {
    connection: Arc<ConnectionManager>,
    dispatcher: Dispatcher,
}

impl ChatClient {
    /// Session using the HTTP fallback described by `settings`.
    pub fn new(settings: &ClientSettings) -> Self {
        Self::with_fallback(settings, Arc::new(HttpFallback::from_settings(settings)))
    }

    /// Session with a custom fallback transport.
    pub fn with_fallback(settings: &ClientSettings, fallback: Arc<dyn FallbackTransport>) -> Self {
        let connection = Arc::new(ConnectionManager::new(ConnectionConfig::from(settings)));
        let source: Arc<dyn ModeSource> = connection.clone();
        let dispatcher = Dispatcher::new(
            source,
            RequestCorrelator::new(settings.reply_timeout()),
            FallbackCaller::new(fallback),
        );
        Self {
            connection,
            dispatcher,
        }
    }

    /// Open the realtime connection. Sends fall back to HTTP if it fails.
    pub async fn start(&self) -> Mode {
        let mode = self.connection.initialize().await;
        info!(%mode, "chat session started");
        mode
    }

    /// Send one message. Always yields a reply.
    pub async fn send_message(&self, text: &str) -> Reply {
        self.dispatcher.send_message(text).await
    }

    /// Current transport mode.
    pub fn mode(&self) -> Mode {
        self.connection.current_mode()
    }

    /// Whether a send is in flight.
    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    /// The connection manager.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Release the realtime connection.
    pub fn close(&self) {
        self.connection.teardown();
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.connection.teardown();
    }
}
