//! Bounded retry policy for remote calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the gateway retries a failing call.
///
/// A 403 gets `forbidden_retries` extra attempts after a fixed
/// `forbidden_delay`, since GitHub uses it both for secondary rate limits and
/// for missing permissions. 5xx responses and network failures get up to
/// `max_attempts` attempts in total with exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub forbidden_retries: u32,
    pub forbidden_delay: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            forbidden_retries: 1,
            forbidden_delay: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps. Used by tests.
    pub fn immediate() -> Self {
        Self {
            forbidden_delay: Duration::ZERO,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before transient attempt `attempt + 1` (attempts count from 1).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_backoff)
    }

    /// Whether another transient attempt is allowed after `attempts` tries.
    pub fn allows_transient(&self, attempts: u32) -> bool {
        attempts < self.max_attempts.max(1)
    }

    /// Whether another attempt is allowed after `forbidden_seen` 403 responses.
    pub fn allows_forbidden(&self, forbidden_seen: u32) -> bool {
        forbidden_seen <= self.forbidden_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retries_forbidden_once() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_forbidden(1));
        assert!(!policy.allows_forbidden(2));
        assert_eq!(policy.forbidden_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(40), Duration::from_secs(5));
    }

    #[test]
    fn test_transient_attempts_are_bounded() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(policy.allows_transient(1));
        assert!(policy.allows_transient(2));
        assert!(!policy.allows_transient(3));
    }

    #[test]
    fn test_zero_max_attempts_still_makes_one_call() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(!policy.allows_transient(1));
    }

    #[test]
    fn test_immediate_policy_never_sleeps() {
        let policy = RetryPolicy::immediate();
        assert_eq!(policy.backoff_for(3), Duration::ZERO);
        assert_eq!(policy.forbidden_delay, Duration::ZERO);
    }
}
