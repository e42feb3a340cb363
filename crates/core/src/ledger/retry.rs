//! Bounded retry with exponential backoff for units of work that lost a lock race.

use std::time::Duration;

use saku_shared::LedgerConfig;

use super::error::LedgerError;

/// How often, and how patiently, a unit of work is retried after lock contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

impl RetryPolicy {
    /// Builds a policy from the `ledger` configuration section.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Returns true if `err` after `attempt` earlier retries should be retried.
    #[must_use]
    pub const fn should_retry(&self, err: &LedgerError, attempt: u32) -> bool {
        err.is_retryable() && attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_delay_doubles_until_capped() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::from_millis(20));
        assert_eq!(policy.delay_for(1), Duration::from_millis(40));
        assert_eq!(policy.delay_for(2), Duration::from_millis(80));
        assert_eq!(policy.delay_for(3), Duration::from_millis(100));
        assert_eq!(policy.delay_for(40), Duration::from_millis(100));
    }

    #[test]
    fn test_only_contention_is_retried() {
        let policy = policy();
        let contention = LedgerError::LockContention("deadlock detected".into());

        assert!(policy.should_retry(&contention, 0));
        assert!(policy.should_retry(&contention, 2));
        assert!(!policy.should_retry(&contention, 3));
        assert!(!policy.should_retry(&LedgerError::Storage("gone".into()), 0));
        assert!(!policy.should_retry(&LedgerError::ZeroAmount, 0));
    }

    #[test]
    fn test_none_never_retries() {
        let contention = LedgerError::LockContention(String::new());
        assert!(!RetryPolicy::none().should_retry(&contention, 0));
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(20));
        assert_eq!(policy.max_delay, Duration::from_millis(500));
    }
}
