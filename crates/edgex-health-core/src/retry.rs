//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use crate::http_client::HttpError;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt.min(i32::MAX as u32) as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                // +/- 50% of the capped delay
                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Which outcomes are retried, how often, and how long to wait in between.
///
/// Retried: transport errors (unless the transport flags them as permanent),
/// HTTP 429, and every 5xx except 501.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism.
    pub enabled: bool,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 4,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with jitter between `wait_min` and `wait_max`.
    pub fn exponential(max_retries: u32, wait_min: Duration, wait_max: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential {
                base: wait_min,
                factor: 2.0,
                max: wait_max.max(wait_min),
                jitter: true,
            },
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub const fn should_retry_status(&self, status: u16) -> bool {
        status == 0 || status == 429 || (status >= 500 && status != 501)
    }

    pub const fn should_retry_error(&self, error: &HttpError) -> bool {
        error.retryable()
    }

    /// Whether another attempt is allowed after `retries_done` retries.
    pub const fn has_budget(&self, retries_done: u32) -> bool {
        self.enabled && retries_done < self.max_retries
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles_until_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_half_of_the_delay() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..10 {
            for attempt in 0..5 {
                let delay_ms = backoff.delay(attempt).as_millis() as f64;
                let expected = (100.0 * 2_f64.powi(attempt as i32)).min(1000.0);

                assert!(delay_ms >= expected * 0.49, "attempt={attempt}, delay_ms={delay_ms}");
                assert!(delay_ms <= expected * 1.51, "attempt={attempt}, delay_ms={delay_ms}");
            }
        }
    }

    #[test]
    fn retries_rate_limits_and_server_errors_except_not_implemented() {
        let config = RetryConfig::default();

        assert!(config.should_retry_status(429));
        assert!(config.should_retry_status(500));
        assert!(config.should_retry_status(502));
        assert!(config.should_retry_status(503));
        assert!(config.should_retry_status(599));
        assert!(!config.should_retry_status(501));
        assert!(!config.should_retry_status(200));
        assert!(!config.should_retry_status(400));
        assert!(!config.should_retry_status(404));
        assert!(!config.should_retry_status(408));
    }

    #[test]
    fn retry_budget_counts_retries_not_attempts() {
        let config = RetryConfig::fixed(Duration::ZERO, 2);

        assert!(config.has_budget(0));
        assert!(config.has_budget(1));
        assert!(!config.has_budget(2));
        assert!(!RetryConfig::no_retry().has_budget(0));
    }

    #[test]
    fn exponential_config_uses_wait_bounds() {
        let config =
            RetryConfig::exponential(3, Duration::from_millis(200), Duration::from_secs(3));

        assert!(config.enabled);
        assert_eq!(config.max_retries, 3);
        assert_eq!(
            config.backoff,
            Backoff::Exponential {
                base: Duration::from_millis(200),
                factor: 2.0,
                max: Duration::from_secs(3),
                jitter: true,
            }
        );
    }
}
