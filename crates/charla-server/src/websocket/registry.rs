//! Live connection bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use charla_core::ConnectionId;
use parking_lot::RwLock;

use super::connection::ClientConnection;

/// Tracks open WebSocket connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    /// Remove a connection, returning it if present.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.write().remove(id)
    }

    /// Number of open connections.
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }
}
