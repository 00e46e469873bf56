//! Responder error types.

use thiserror::Error;

/// Errors a [`Responder`](crate::Responder) can return.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponderError {
    /// The message was empty after trimming.
    #[error("message is empty")]
    EmptyMessage,
    /// The responder could not produce a reply.
    #[error("responder unavailable: {0}")]
    Unavailable(String),
}
