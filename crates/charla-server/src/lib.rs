//! # charla-server
//!
//! Axum server exposing a [`Responder`](charla_responder::Responder) over
//! both transports:
//!
//! - `POST /api/chat`: fallback request/response
//! - `GET /api/socket`: realtime WebSocket (`user-message` in, `bot-message` out)
//! - `GET /health`: liveness and connection count

#![deny(unsafe_code)]

pub mod chat;
pub mod config;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::{AppState, ChatServer};
pub use shutdown::ShutdownCoordinator;
