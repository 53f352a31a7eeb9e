use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Minimum-interval gate for one consumer's remote fetches.
///
/// Owned by a single consumer and never shared. A throttle that has never
/// recorded a request permits the first one.
pub struct RequestThrottle {
    min_interval: Duration,
    last_request_at: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_request_at: None,
            clock,
        }
    }

    /// Forced requests always pass. Unforced ones pass once `min_interval`
    /// has elapsed since the last recorded request.
    pub fn can_request(&self, force: bool) -> bool {
        if force {
            return true;
        }
        match self.last_request_at {
            None => true,
            Some(last) => self.clock.now().saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// Call only when the request actually proceeds.
    pub fn record_request(&mut self) {
        self.last_request_at = Some(self.clock.now());
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("min_interval", &self.min_interval)
            .field("last_request_at", &self.last_request_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;

    fn throttle(min_ms: u64) -> (RequestThrottle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            RequestThrottle::new(Duration::from_millis(min_ms), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_first_request_permitted() {
        let (throttle, _clock) = throttle(1000);
        assert!(throttle.can_request(false));
    }

    #[test]
    fn test_blocked_right_after_record_then_open_after_interval() {
        let (mut throttle, clock) = throttle(1000);
        throttle.record_request();
        assert!(!throttle.can_request(false));

        clock.advance(Duration::from_millis(999));
        assert!(!throttle.can_request(false));

        clock.advance(Duration::from_millis(1));
        assert!(throttle.can_request(false));
    }

    #[test]
    fn test_force_always_passes() {
        let (mut throttle, _clock) = throttle(60_000);
        throttle.record_request();
        assert!(throttle.can_request(true));
        assert!(!throttle.can_request(false));
    }

    #[test]
    fn test_checking_does_not_consume() {
        let (mut throttle, clock) = throttle(100);
        throttle.record_request();
        clock.advance(Duration::from_millis(150));
        assert!(throttle.can_request(false));
        assert!(throttle.can_request(false));
    }
}
