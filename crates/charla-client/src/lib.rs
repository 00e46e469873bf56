//! # charla-client
//!
//! Dual-transport message delivery.
//!
//! - [`connection`]: owns the realtime WebSocket and derives the transport [`Mode`](charla_core::Mode)
//! - [`correlator`]: matches a realtime send to its reply under a deadline
//! - [`fallback`]: one HTTP call per message when realtime is unavailable
//! - [`dispatcher`]: validates input and picks a transport per call
//! - [`session`]: [`ChatClient`] wiring all of the above from settings
//!
//! Every send resolves to a [`Reply`](charla_core::Reply); failures become
//! apologies and are logged with `tracing`.

#![deny(unsafe_code)]

pub mod connection;
pub mod correlator;
pub mod dispatcher;
pub mod fallback;
pub mod session;

pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, LifecycleEvent, ModeSource, RealtimeLink,
};
pub use correlator::{PendingRequest, RequestCorrelator};
pub use dispatcher::Dispatcher;
pub use fallback::{FallbackCaller, FallbackTransport, HttpFallback};
pub use session::ChatClient;
