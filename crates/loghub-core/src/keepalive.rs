//! Keepalive Policy
//!
//! Detects half-open transports that the transport layer never reports as
//! closed. The holder of a connection sends a `ping` on a fixed interval;
//! the peer replies `pong` immediately. If no `pong` is observed for longer
//! than three intervals, the connection is forcibly closed.
//!
//! Both the server-side connection actor and the viewer-side subscriber use
//! this policy; only who initiates the ping differs.

use std::time::Duration;
use tokio::time::Instant;

/// Keepalive timing configuration.
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// How often a `ping` is sent
    pub ping_interval: Duration,
    /// How long to wait for a `pong` before forcing closure
    pub pong_timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self::from_interval(Duration::from_secs(15))
    }
}

impl KeepaliveConfig {
    /// Build a config with the standard three-interval pong deadline.
    pub fn from_interval(ping_interval: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout: ping_interval * 3,
        }
    }
}

/// Tracks when the last `pong` (or equivalent liveness signal) was seen.
#[derive(Debug)]
pub struct KeepaliveState {
    last_seen: Instant,
}

impl KeepaliveState {
    pub fn new() -> Self {
        Self {
            last_seen: Instant::now(),
        }
    }

    /// Record a liveness signal from the peer.
    pub fn observe(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Whether the pong deadline has passed.
    pub fn is_expired(&self, config: &KeepaliveConfig) -> bool {
        self.last_seen.elapsed() > config.pong_timeout
    }
}

impl Default for KeepaliveState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deadline_is_three_intervals() {
        let config = KeepaliveConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.pong_timeout, Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn expires_only_past_the_deadline() {
        let config = KeepaliveConfig::default();
        let state = KeepaliveState::new();

        tokio::time::advance(Duration::from_secs(44)).await;
        assert!(!state.is_expired(&config));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(state.is_expired(&config));
    }

    #[tokio::test(start_paused = true)]
    async fn observing_a_pong_resets_the_deadline() {
        let config = KeepaliveConfig::default();
        let mut state = KeepaliveState::new();

        tokio::time::advance(Duration::from_secs(40)).await;
        state.observe();
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(!state.is_expired(&config));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(state.is_expired(&config));
    }
}
