//! The [`Responder`] seam and the keyword implementation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::catalog;
use crate::classify::classify;
use crate::errors::ResponderError;
use crate::latency::Latency;

/// Something that turns a message into a reply.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a reply for `message`.
    async fn respond(&self, message: &str) -> Result<String, ResponderError>;
}

#[async_trait]
impl<T: Responder + ?Sized> Responder for Arc<T> {
    async fn respond(&self, message: &str) -> Result<String, ResponderError> {
        (**self).respond(message).await
    }
}

/// Picks a canned reply by keyword category after a simulated delay.
pub struct KeywordResponder {
    latency: Latency,
    rng: Mutex<StdRng>,
}

impl KeywordResponder {
    /// Responder seeded from the OS.
    pub fn new(latency: Latency) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic responder for tests.
    pub fn with_seed(latency: Latency, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick a reply and a delay without waiting.
    pub fn pick(&self, message: &str) -> Result<(String, std::time::Duration), ResponderError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(ResponderError::EmptyMessage);
        }
        let category = classify(trimmed);
        let mut rng = self.rng.lock();
        let reply = catalog::replies(category)
            .choose(&mut *rng)
            .ok_or_else(|| ResponderError::Unavailable(format!("no replies for {category}")))?;
        let delay = self.latency.sample(&mut *rng);
        debug!(%category, delay_ms = delay.as_millis(), "reply selected");
        Ok(((*reply).to_string(), delay))
    }
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new(Latency::default())
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, message: &str) -> Result<String, ResponderError> {
        let (reply, delay) = self.pick(message)?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }
}
