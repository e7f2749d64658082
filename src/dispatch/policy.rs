//! Retry policy and backoff computation.

use std::time::Duration;

/// Timing knobs governing retries, backoff, and request pacing.
///
/// Immutable for the process lifetime; built from [`crate::config::Config`]
/// at startup.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries granted to each backend beyond its initial attempt.
    pub max_retries_per_backend: u32,
    /// Delay for the first backoff wait.
    pub base_delay: Duration,
    /// Cap applied to computed and server-suggested waits alike.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Minimum spacing between consecutive remote calls.
    pub min_request_interval: Duration,
    /// Fixed wait before retrying after a timeout or transport failure.
    pub transport_retry_delay: Duration,
    /// Pause between finishing one work item and dequeuing the next.
    pub inter_item_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries_per_backend: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            min_request_interval: Duration::from_millis(100),
            transport_retry_delay: Duration::from_secs(2),
            inter_item_pause: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff wait for the given zero-based attempt, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let delay = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Clamp a server-suggested wait to `max_delay`.
    pub fn cap_hint(&self, hint: Duration) -> Duration {
        hint.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries_per_backend: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = policy();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_monotonic_until_capped() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for attempt in 0..16 {
            let delay = policy.backoff_delay(attempt);
            assert!(delay >= previous);
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
        assert_eq!(policy.backoff_delay(15), policy.max_delay);
    }

    #[test]
    fn hint_is_capped_at_max_delay() {
        let policy = policy();
        assert_eq!(
            policy.cap_hint(Duration::from_millis(300)),
            Duration::from_millis(300)
        );
        assert_eq!(policy.cap_hint(Duration::from_secs(90)), policy.max_delay);
    }
}
