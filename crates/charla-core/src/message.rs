//! Message, reply, and transport mode.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ChatError, ErrorKind};

/// Which transport a message travels over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Persistent bidirectional connection.
    Realtime,
    /// Discrete request/response calls.
    #[default]
    Fallback,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realtime => f.write_str("realtime"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// A validated outgoing message: trimmed and non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message(String);

impl Message {
    /// Validate raw user input.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChatError::Validation {
                reason: if raw.is_empty() {
                    "empty input".into()
                } else {
                    "whitespace-only input".into()
                },
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The trimmed text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a [`Reply`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplySource {
    /// A genuine bot reply delivered over the given transport.
    Bot(Mode),
    /// An apology standing in for a failed delivery.
    Apology(ErrorKind),
}

/// The outcome of a send: always carries text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    text: String,
    source: ReplySource,
}

impl Reply {
    /// A genuine bot reply.
    pub fn bot(text: impl Into<String>, mode: Mode) -> Self {
        Self {
            text: text.into(),
            source: ReplySource::Bot(mode),
        }
    }

    /// The apology for a delivery error.
    #[must_use]
    pub fn apology(error: &ChatError) -> Self {
        Self {
            text: error.apology().to_owned(),
            source: ReplySource::Apology(error.kind()),
        }
    }

    /// Reply text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the reply came from.
    #[must_use]
    pub fn source(&self) -> ReplySource {
        self.source
    }

    /// Whether this reply is an apology rather than a bot answer.
    #[must_use]
    pub fn is_apology(&self) -> bool {
        matches!(self.source, ReplySource::Apology(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
