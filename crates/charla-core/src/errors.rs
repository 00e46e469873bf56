//! Delivery error taxonomy.
//!
//! None of these errors reach the caller of `send_message`: each kind maps to
//! a fixed apology via [`ChatError::apology`], and the detail is logged.

use std::fmt;

use thiserror::Error;

use crate::apology;

/// Errors raised while delivering a message.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Input rejected at the dispatcher boundary.
    #[error("invalid message: {reason}")]
    Validation {
        /// Why the input was rejected.
        reason: String,
    },

    /// The realtime channel produced no reply before the deadline.
    #[error("no reply within {timeout_ms}ms")]
    TransportTimeout {
        /// The deadline that elapsed.
        timeout_ms: u64,
    },

    /// Connection or network failure on either transport.
    #[error("transport failure: {message}")]
    Transport {
        /// What went wrong.
        message: String,
    },

    /// The responder answered, but not successfully.
    #[error("responder failure{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Responder {
        /// HTTP status, when the failure came from the fallback endpoint.
        status: Option<u16>,
        /// What went wrong.
        message: String,
    },
}

/// Coarse classification of a [`ChatError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ChatError::Validation`].
    Validation,
    /// See [`ChatError::TransportTimeout`].
    TransportTimeout,
    /// See [`ChatError::Transport`].
    Transport,
    /// See [`ChatError::Responder`].
    Responder,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::TransportTimeout => "transport_timeout",
            Self::Transport => "transport",
            Self::Responder => "responder",
        };
        f.write_str(s)
    }
}

impl ChatError {
    /// Build a transport error from anything displayable.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Build a responder error without an HTTP status.
    pub fn responder(message: impl fmt::Display) -> Self {
        Self::Responder {
            status: None,
            message: message.to_string(),
        }
    }

    /// Error classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::TransportTimeout { .. } => ErrorKind::TransportTimeout,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Responder { .. } => ErrorKind::Responder,
        }
    }

    /// The user-facing text that replaces the bot reply for this error.
    #[must_use]
    pub fn apology(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => apology::INVALID_MESSAGE,
            ErrorKind::TransportTimeout => apology::TIMED_OUT,
            ErrorKind::Transport | ErrorKind::Responder => apology::PROCESSING_FAILED,
        }
    }
}

/// Result alias for delivery operations.
pub type Result<T> = std::result::Result<T, ChatError>;
