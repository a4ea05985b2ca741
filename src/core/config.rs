//! Settlement configuration
//!
//! Worker pool size, retry budget, backoff constants and the per-attempt
//! timeout. Zero values passed to the constructors fall back to the defaults
//! with a warning.

use std::time::Duration;

use tracing::warn;

/// Retry budget and backoff curve for transient gateway failures
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of gateway attempts per withdrawal (first try included)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for any delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Create a new RetryPolicy with custom values
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: u32,
    ) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            warn!(
                "Invalid max_attempts ({}), using default ({})",
                max_attempts, default.max_attempts
            );
            default.max_attempts
        } else {
            max_attempts
        };

        let multiplier = if multiplier == 0 {
            warn!(
                "Invalid backoff multiplier ({}), using default ({})",
                multiplier, default.multiplier
            );
            default.multiplier
        } else {
            multiplier
        };

        let max_backoff = if max_backoff < initial_backoff {
            warn!(
                "max_backoff ({:?}) is below initial_backoff ({:?}), raising it",
                max_backoff, initial_backoff
            );
            initial_backoff
        } else {
            max_backoff
        };

        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            multiplier,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// `initial_backoff * multiplier^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Check whether another attempt is allowed after `attempts` have been made
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Configuration of the settlement worker pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Number of worker tasks
    pub worker_count: usize,
    pub retry: RetryPolicy,
    /// Bound on a single gateway call; expiry counts as a transient failure
    pub attempt_timeout: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl SettlementConfig {
    /// Create a new SettlementConfig with custom values
    pub fn new(worker_count: usize, retry: RetryPolicy, attempt_timeout: Duration) -> Self {
        let default = Self::default();

        let worker_count = if worker_count == 0 {
            warn!(
                "Invalid worker_count ({}), using default ({})",
                worker_count, default.worker_count
            );
            default.worker_count
        } else {
            worker_count
        };

        let attempt_timeout = if attempt_timeout.is_zero() {
            warn!(
                "Invalid attempt_timeout ({:?}), using default ({:?})",
                attempt_timeout, default.attempt_timeout
            );
            default.attempt_timeout
        } else {
            attempt_timeout
        };

        Self {
            worker_count,
            retry,
            attempt_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::first_retry(1, 50)]
    #[case::second_retry(2, 100)]
    #[case::third_retry(3, 200)]
    #[case::capped(10, 2000)]
    #[case::far_beyond_cap(64, 2000)]
    fn test_backoff_grows_and_caps(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_for(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn test_allows_retry_until_budget() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10), 2);

        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[rstest]
    #[case::zero_attempts(0, 2, 5, 2)]
    #[case::zero_multiplier(3, 0, 3, 2)]
    fn test_retry_zero_values_fallback(
        #[case] max_attempts: u32,
        #[case] multiplier: u32,
        #[case] expected_attempts: u32,
        #[case] expected_multiplier: u32,
    ) {
        let policy = RetryPolicy::new(
            max_attempts,
            Duration::from_millis(10),
            Duration::from_millis(100),
            multiplier,
        );

        assert_eq!(policy.max_attempts, expected_attempts);
        assert_eq!(policy.multiplier, expected_multiplier);
    }

    #[test]
    fn test_max_backoff_is_raised_to_initial() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(10), 2);

        assert_eq!(policy.max_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_settlement_zero_values_fallback() {
        let config = SettlementConfig::new(0, RetryPolicy::default(), Duration::ZERO);

        assert_eq!(config.worker_count, num_cpus::get());
        assert_eq!(config.attempt_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_settlement_custom_values() {
        let config = SettlementConfig::new(3, RetryPolicy::default(), Duration::from_millis(250));

        assert_eq!(config.worker_count, 3);
        assert_eq!(config.attempt_timeout, Duration::from_millis(250));
    }
}
