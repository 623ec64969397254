//! Bounded exponential backoff for enrichment attempts.

use crate::config::EnrichmentConfig;
use crate::constants::enrichment;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: enrichment::MAX_ATTEMPTS,
            base_delay: Duration::from_secs(enrichment::BACKOFF_BASE_SECONDS),
            multiplier: enrichment::BACKOFF_MULTIPLIER,
            max_delay: Duration::from_secs(enrichment::BACKOFF_MAX_SECONDS),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.backoff_base(),
            multiplier: config.backoff_multiplier,
            max_delay: config.backoff_max(),
        }
    }

    /// Wait after failed attempt `attempt` (1-based) before the next one
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.powi(exponent);
        if !factor.is_finite() || factor * self.base_delay.as_secs_f64() >= self.max_delay.as_secs_f64()
        {
            return self.max_delay;
        }
        self.base_delay.mul_f64(factor).min(self.max_delay)
    }

    pub fn has_attempts_left(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.has_attempts_left(2));
        assert!(!policy.has_attempts_left(3));
    }

    #[test]
    fn test_from_config_never_allows_zero_attempts() {
        let config = EnrichmentConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }
}
