//! Capped exponential backoff.
//!
//! The poll loop uses it to space out cycles while the upstream is failing,
//! and the poll cycle uses it between registry save attempts.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
    resume_at: Option<Instant>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            failures: 0,
            resume_at: None,
        }
    }

    /// True once the delay from the last failure has elapsed.
    pub fn ready(&self) -> bool {
        self.resume_at.map_or(true, |at| Instant::now() >= at)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.resume_at = None;
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn fail(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = self.delay_for(self.failures);
        self.resume_at = Some(Instant::now() + delay);
        delay
    }

    /// base * 2^(failures - 1), capped at max.
    fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base.saturating_mul(1 << exponent).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_backoff_is_ready() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1));
        assert!(backoff.ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn delays_double_until_capped() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(backoff.fail(), Duration::from_millis(100));
        assert_eq!(backoff.fail(), Duration::from_millis(200));
        assert_eq!(backoff.fail(), Duration::from_millis(350));
        assert_eq!(backoff.fail(), Duration::from_millis(350));
        assert_eq!(backoff.failures(), 4);
    }

    #[test]
    fn reset_clears_pending_delay() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
        backoff.fail();
        assert!(!backoff.ready());

        backoff.reset();
        assert!(backoff.ready());
        assert_eq!(backoff.fail(), Duration::from_secs(5));
    }

    #[test]
    fn many_failures_do_not_overflow() {
        let mut backoff = Backoff::new(Duration::from_millis(1), Duration::from_secs(30));
        for _ in 0..100 {
            backoff.fail();
        }
        assert_eq!(backoff.fail(), Duration::from_secs(30));
    }
}
