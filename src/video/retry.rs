//! Retry policy and exponential backoff with jitter.

use std::time::Duration;

/// Timing and retry limits for the operation poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total submissions allowed, including the first.
    pub max_attempts: u32,
    /// Backoff before the second submission. Doubles on each attempt.
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random addend.
    pub max_jitter: Duration,
    /// Wait between operation refreshes.
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(30),
            max_jitter: Duration::from_secs(10),
            poll_interval: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Sets the maximum number of submissions.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base backoff delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the jitter bound.
    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Starts a fresh retry sequence.
    pub fn start(&self) -> RetryState {
        RetryState {
            attempt: 0,
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_jitter: self.max_jitter,
        }
    }
}

/// Attempt counter for one top-level poller call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
    max_jitter: Duration,
}

impl RetryState {
    /// Zero-based index of the current attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the current attempt is within the limit.
    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Whether the current attempt is the final one.
    pub fn is_last(&self) -> bool {
        self.attempt + 1 >= self.max_attempts
    }

    /// `base_delay * 2^attempt`, saturating.
    pub fn min_delay(&self) -> Duration {
        let factor = 2u32.checked_pow(self.attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff for the current attempt given a jitter fraction in `[0, 1)`.
    ///
    /// The result lies in `[min_delay, min_delay + max_jitter)`.
    pub fn backoff(&self, jitter_fraction: f64) -> Duration {
        let fraction = jitter_fraction.clamp(0.0, 1.0);
        let jitter_nanos = (self.max_jitter.as_nanos() as f64 * fraction) as u64;
        let jitter = Duration::from_nanos(jitter_nanos).min(
            self.max_jitter
                .saturating_sub(Duration::from_nanos(1)),
        );
        self.min_delay().saturating_add(jitter)
    }

    /// Moves to the next attempt.
    pub fn advance(&mut self) {
        self.attempt += 1;
    }
}

/// Draws a jitter fraction in `[0, 1)`.
pub(crate) fn random_jitter_fraction() -> f64 {
    use rand::Rng;
    rand::rng().random::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(30));
        assert_eq!(policy.max_jitter, Duration::from_secs(10));
        assert_eq!(policy.poll_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_min_delay_doubles() {
        let mut state = RetryPolicy::default().start();
        let expected = [30, 60, 120, 240, 480];
        for secs in expected {
            assert_eq!(state.min_delay(), Duration::from_secs(secs));
            state.advance();
        }
    }

    #[test]
    fn test_backoff_stays_within_jitter_bounds() {
        let mut state = RetryPolicy::default().start();
        while state.has_remaining() {
            let floor = state.min_delay();
            let ceiling = floor + Duration::from_secs(10);
            for fraction in [0.0, 0.25, 0.5, 0.999_999, 1.0] {
                let delay = state.backoff(fraction);
                assert!(delay >= floor, "{delay:?} < {floor:?}");
                assert!(delay < ceiling, "{delay:?} >= {ceiling:?}");
            }
            let random = state.backoff(random_jitter_fraction());
            assert!(random >= floor && random < ceiling);
            state.advance();
        }
    }

    #[test]
    fn test_last_attempt_tracking() {
        let mut state = RetryPolicy::default().with_max_attempts(2).start();
        assert!(state.has_remaining());
        assert!(!state.is_last());
        state.advance();
        assert!(state.is_last());
        state.advance();
        assert!(!state.has_remaining());
        assert_eq!(state.attempt(), 2);
        assert_eq!(state.max_attempts(), 2);
    }

    #[test]
    fn test_min_delay_saturates() {
        let mut state = RetryPolicy::default().with_max_attempts(100).start();
        for _ in 0..64 {
            state.advance();
        }
        assert_eq!(state.min_delay(), Duration::from_secs(30).saturating_mul(u32::MAX));
    }
}
