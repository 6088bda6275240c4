//! Capped exponential backoff for link acquisition

use continuity_core::ReconnectPolicy;
use std::time::Duration;

/// Delay sequence `initial, initial*m, initial*m^2, ...` capped at `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    max: Duration,
    multiplier: u32,
}

impl Backoff {
    /// Create from a reconnect policy
    pub fn new(policy: &ReconnectPolicy) -> Self {
        let initial = policy.initial_delay().min(policy.max_delay());
        Self {
            initial,
            current: initial,
            max: policy.max_delay(),
            multiplier: policy.multiplier.max(1),
        }
    }

    /// Delay to wait now; advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(self.multiplier).min(self.max);
        delay
    }

    /// Start over from the initial delay
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial_ms: u64, max_ms: u64, multiplier: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay_ms: initial_ms,
            max_delay_ms: max_ms,
            multiplier,
            max_attempts: 5,
        }
    }

    #[test]
    fn test_exponential_then_capped() {
        let mut backoff = Backoff::new(&policy(100, 1000, 2));
        let delays: Vec<u64> = (0..6)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(&policy(10, 100, 3));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_multiplier_one_is_constant() {
        let mut backoff = Backoff::new(&policy(50, 100, 1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_zero_initial_delay() {
        let mut backoff = Backoff::new(&policy(0, 100, 2));
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert_eq!(backoff.next_delay(), Duration::ZERO);
    }
}
