//! Reconnect Backoff Policy
//!
//! Delay before reconnect attempt `n` is `min(base * 2^(n-1), cap)`:
//! doubling from the base, capped. Attempts count consecutive failed or
//! closed cycles and reset to zero only once a connection reaches the
//! authenticated state - a connection that opens but dies before
//! authenticating keeps escalating.

use std::time::Duration;

/// Capped exponential backoff for reconnect scheduling.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt
    pub base: Duration,
    /// Maximum delay between attempts
    pub cap: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(15),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        // Past 16 doublings the cap always wins; bounding the shift keeps
        // the multiplication from overflowing.
        let factor = 1u32 << (attempt - 1).min(16);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_then_caps() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(8));
        assert_eq!(policy.delay(5), Duration::from_secs(15)); // capped
        assert_eq!(policy.delay(6), Duration::from_secs(15)); // still capped
    }

    #[test]
    fn attempt_zero_is_treated_as_the_first() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(0), policy.delay(1));
    }

    #[test]
    fn very_large_attempts_stay_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(1000), Duration::from_secs(15));
    }

    #[test]
    fn custom_base_and_cap() {
        let policy = ReconnectPolicy {
            base: Duration::from_millis(100),
            cap: Duration::from_millis(450),
        };

        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(policy.delay(4), Duration::from_millis(450));
    }
}
