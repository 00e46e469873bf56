//! Wire formats for both transports.
//!
//! Realtime frames are JSON text frames tagged by event name:
//!
//! ```text
//! {"event":"user-message","data":{"message":"hola"}}
//! {"event":"bot-message","data":{"message":"¡Hola! ¿Cómo estás?"}}
//! ```
//!
//! The fallback endpoint takes a [`ChatRequest`] and answers with a
//! [`ChatResponse`] or an [`ErrorBody`].

use serde::{Deserialize, Serialize};

/// Payload shared by both realtime events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Message text.
    pub message: String,
}

/// Frames sent by the client over the realtime channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// A user message awaiting a bot reply.
    UserMessage(MessagePayload),
}

impl ClientEvent {
    /// Build a `user-message` frame.
    pub fn user_message(message: impl Into<String>) -> Self {
        Self::UserMessage(MessagePayload {
            message: message.into(),
        })
    }
}

/// Frames sent by the server over the realtime channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A bot reply.
    BotMessage(MessagePayload),
}

impl ServerEvent {
    /// Build a `bot-message` frame.
    pub fn bot_message(message: impl Into<String>) -> Self {
        Self::BotMessage(MessagePayload {
            message: message.into(),
        })
    }
}

/// Fallback request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Message text.
    pub message: String,
}

/// Fallback success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Bot reply.
    pub message: String,
    /// RFC 3339 timestamp of the reply.
    pub timestamp: String,
}

/// Fallback error body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error.
    pub error: String,
}
