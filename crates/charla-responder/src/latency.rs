//! Simulated thinking time.

use std::time::Duration;

use rand::Rng;

/// Inclusive range a reply delay is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Latency {
    /// Shortest delay.
    pub min: Duration,
    /// Longest delay.
    pub max: Duration,
}

impl Latency {
    /// Build from millisecond bounds. Bounds are swapped if inverted.
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(lo),
            max: Duration::from_millis(hi),
        }
    }

    /// No delay at all.
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Draw a delay uniformly from `[min, max]`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let lo = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rng.random_range(lo..=hi))
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::from_millis(1_000, 3_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn none_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(Latency::none().sample(&mut rng), Duration::ZERO);
    }

    #[test]
    fn samples_stay_in_range() {
        let latency = Latency::from_millis(1_000, 3_000);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let d = latency.sample(&mut rng);
            assert!(d >= latency.min && d <= latency.max, "{d:?}");
        }
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let latency = Latency::from_millis(500, 100);
        assert_eq!(latency.min, Duration::from_millis(100));
        assert_eq!(latency.max, Duration::from_millis(500));
    }
}
