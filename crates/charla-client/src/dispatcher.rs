//! Dispatcher: validates input and routes each message to one transport.

use std::sync::Arc;

use charla_core::{Message, Mode, Reply};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::connection::ModeSource;
use crate::correlator::RequestCorrelator;
use crate::fallback::FallbackCaller;

/// Public send entry point.
pub struct Dispatcher {
    source: Arc<dyn ModeSource>,
    correlator: RequestCorrelator,
    fallback: FallbackCaller,
    in_flight: watch::Sender<usize>,
}

impl Dispatcher {
    /// Dispatcher reading the mode from `source` on every send.
    pub fn new(
        source: Arc<dyn ModeSource>,
        correlator: RequestCorrelator,
        fallback: FallbackCaller,
    ) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            source,
            correlator,
            fallback,
            in_flight,
        }
    }

    /// Deliver `raw` and return the reply, or an apology on any failure.
    ///
    /// Empty or whitespace-only input is answered immediately without
    /// touching either transport.
    pub async fn send_message(&self, raw: &str) -> Reply {
        let message = match Message::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, kind = %e.kind(), "message rejected");
                return Reply::apology(&e);
            }
        };

        let _guard = InFlightGuard::enter(&self.in_flight);
        let mode = self.source.current_mode();
        // the link can close before the mode catches up
        let link = match mode {
            Mode::Realtime => self.source.link().filter(|link| !link.is_closed()),
            Mode::Fallback => None,
        };
        debug!(%mode, live_link = link.is_some(), "dispatching");

        match link {
            Some(link) => self.correlator.send(&message, &link).await,
            None => self.fallback.send(&message).await,
        }
    }

    /// Whether any send is awaiting resolution.
    pub fn is_loading(&self) -> bool {
        *self.in_flight.borrow() > 0
    }

    /// Number of sends awaiting resolution.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Watch the in-flight count.
    pub fn watch_in_flight(&self) -> watch::Receiver<usize> {
        self.in_flight.subscribe()
    }
}

/// Counts one send as in flight until dropped.
struct InFlightGuard<'a> {
    counter: &'a watch::Sender<usize>,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a watch::Sender<usize>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.send_modify(|n| *n = n.saturating_sub(1));
    }
}
