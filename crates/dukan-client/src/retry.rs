//! # Retry Policy
//!
//! Exponential backoff for transient request failures.
//!
//! ## Schedule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 0 ──fail──► wait base × 1                                      │
//! │  attempt 1 ──fail──► wait base × 2                                      │
//! │  attempt 2 ──fail──► wait base × 4                                      │
//! │  attempt 3 ──fail──► give up (max_retries = 3), return last error       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no jitter and no cap: the delays are exactly
//! `base_delay × 2^attempt`, so tests can assert them on a paused clock.

use backoff::backoff::Backoff;
use std::time::Duration;

/// How many times to retry, and how long to wait before the first retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
        }
    }

    /// A policy that sends exactly once.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay after failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// A fresh backoff iterator for one call.
    pub fn backoff(&self) -> DoublingBackoff {
        DoublingBackoff {
            policy: *self,
            attempt: 0,
        }
    }
}

/// [`Backoff`] yielding `base × 2^n` for the first `max_retries` failures,
/// then `None`.
#[derive(Debug, Clone)]
pub struct DoublingBackoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl DoublingBackoff {
    /// Number of delays handed out so far.
    pub fn retries_used(&self) -> u32 {
        self.attempt
    }
}

impl Backoff for DoublingBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_retries {
            return None;
        }
        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_doubling_schedule() {
        let mut backoff = RetryPolicy::new(3, Duration::from_millis(1000)).backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(1000)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(2000)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(4000)));
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(backoff.retries_used(), 3);

        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(RetryPolicy::no_retry().backoff().next_backoff(), None);
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(64, Duration::from_secs(1));
        assert_eq!(policy.delay_for(40), Duration::from_secs(u32::MAX as u64));
    }
}
