//! # charla-core
//!
//! Foundation types shared by every Charla crate.
//!
//! - [`message`]: validated [`Message`], always-present [`Reply`], transport [`Mode`]
//! - [`wire`]: JSON shapes for the realtime channel and the fallback endpoint
//! - [`errors`]: the delivery error taxonomy and its apology mapping
//! - [`apology`]: user-facing fallback texts
//! - [`ids`]: connection and correlation identifiers
//! - [`logging`]: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod apology;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;
pub mod wire;

pub use errors::{ChatError, ErrorKind, Result};
pub use ids::{ConnectionId, CorrelationKey};
pub use message::{Message, Mode, Reply, ReplySource};
