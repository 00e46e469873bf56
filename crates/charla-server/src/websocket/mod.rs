//! Realtime transport: one WebSocket session per client.

pub mod connection;
pub mod handler;
pub mod registry;
pub mod session;
