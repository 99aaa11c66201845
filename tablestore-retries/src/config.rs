//! Retry configuration.

use crate::backoff::{ExponentialBackoff, LinearBackoff};
use crate::strategy::BackoffStrategy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for retry behavior.
///
/// Budgets are signed: a budget is exhausted once it drops below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of retries.
    pub retry_total: i32,
    /// Retries allowed after connect-phase errors.
    pub retry_connect: i32,
    /// Retries allowed after response-phase errors.
    pub retry_read: i32,
    /// Retries allowed after retryable status codes.
    pub retry_status: i32,
    /// Whether reads may fail over to the secondary endpoint.
    ///
    /// Only enable this for read-access geo-redundant accounts where
    /// potentially stale data can be handled.
    pub retry_to_secondary: bool,
    /// Wait strategy.
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_total: 10,
            retry_connect: 3,
            retry_read: 3,
            retry_status: 3,
            retry_to_secondary: false,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exponential retry: 3 retries after 15, 18, 24 seconds (±3 s).
    pub fn exponential() -> Self {
        Self::new()
            .retry_total(3)
            .backoff(BackoffConfig::exponential())
    }

    /// Linear retry: 3 retries every 15 seconds (±3 s).
    pub fn linear() -> Self {
        Self::new().retry_total(3).backoff(BackoffConfig::linear())
    }

    /// Set the total retry budget.
    pub fn retry_total(mut self, n: i32) -> Self {
        self.retry_total = n;
        self
    }

    /// Set the connect-phase error budget.
    pub fn retry_connect(mut self, n: i32) -> Self {
        self.retry_connect = n;
        self
    }

    /// Set the response-phase error budget.
    pub fn retry_read(mut self, n: i32) -> Self {
        self.retry_read = n;
        self
    }

    /// Set the retryable status budget.
    pub fn retry_status(mut self, n: i32) -> Self {
        self.retry_status = n;
        self
    }

    /// Allow failover to the secondary endpoint.
    pub fn retry_to_secondary(mut self, enabled: bool) -> Self {
        self.retry_to_secondary = enabled;
        self
    }

    /// Set the wait strategy.
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Serializable description of a wait strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffConfig {
    /// Exponential backoff.
    Exponential {
        /// Base interval.
        #[serde(with = "duration_secs")]
        initial_backoff: Duration,
        /// Base, in seconds, raised to the attempt count.
        increment_base: u32,
        /// Jitter on either side.
        #[serde(with = "duration_secs")]
        random_jitter_range: Duration,
    },
    /// Fixed interval.
    Linear {
        /// Interval between retries.
        #[serde(with = "duration_secs")]
        backoff: Duration,
        /// Jitter on either side.
        #[serde(with = "duration_secs")]
        random_jitter_range: Duration,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::exponential()
    }
}

impl BackoffConfig {
    /// Exponential backoff with default parameters.
    pub fn exponential() -> Self {
        let defaults = ExponentialBackoff::default();
        Self::Exponential {
            initial_backoff: defaults.initial_backoff,
            increment_base: defaults.increment_base,
            random_jitter_range: defaults.random_jitter_range,
        }
    }

    /// Linear backoff with default parameters.
    pub fn linear() -> Self {
        let defaults = LinearBackoff::default();
        Self::Linear {
            backoff: defaults.backoff,
            random_jitter_range: defaults.random_jitter_range,
        }
    }

    /// Build the strategy described by this config.
    pub fn build(&self) -> Arc<dyn BackoffStrategy> {
        match self {
            Self::Exponential {
                initial_backoff,
                increment_base,
                random_jitter_range,
            } => Arc::new(ExponentialBackoff {
                initial_backoff: *initial_backoff,
                increment_base: *increment_base,
                random_jitter_range: *random_jitter_range,
            }),
            Self::Linear {
                backoff,
                random_jitter_range,
            } => Arc::new(LinearBackoff::new(*backoff, *random_jitter_range)),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.retry_total, 10);
        assert_eq!(config.retry_connect, 3);
        assert_eq!(config.retry_read, 3);
        assert_eq!(config.retry_status, 3);
        assert!(!config.retry_to_secondary);
        assert_eq!(config.backoff, BackoffConfig::exponential());
    }

    #[test]
    fn test_presets() {
        let exponential = RetryConfig::exponential();
        assert_eq!(exponential.retry_total, 3);
        assert_eq!(exponential.backoff, BackoffConfig::exponential());

        let linear = RetryConfig::linear();
        assert_eq!(linear.retry_total, 3);
        assert_eq!(
            linear.backoff,
            BackoffConfig::Linear {
                backoff: Duration::from_secs(15),
                random_jitter_range: Duration::from_secs(3),
            }
        );
    }

    #[test]
    fn test_config_builder() {
        let config = RetryConfig::new()
            .retry_total(5)
            .retry_connect(1)
            .retry_to_secondary(true);

        assert_eq!(config.retry_total, 5);
        assert_eq!(config.retry_connect, 1);
        assert!(config.retry_to_secondary);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RetryConfig = serde_json::from_str(
            r#"{
                "retry_total": 4,
                "retry_to_secondary": true,
                "backoff": { "kind": "linear", "backoff": 2.5, "random_jitter_range": 0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.retry_total, 4);
        assert_eq!(config.retry_status, 3);
        assert!(config.retry_to_secondary);
        assert_eq!(
            config.backoff,
            BackoffConfig::Linear {
                backoff: Duration::from_millis(2500),
                random_jitter_range: Duration::ZERO,
            }
        );
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result: Result<BackoffConfig, _> = serde_json::from_str(
            r#"{ "kind": "linear", "backoff": -1, "random_jitter_range": 0 }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_build_strategy() {
        let strategy = BackoffConfig::Exponential {
            initial_backoff: Duration::from_secs(1),
            increment_base: 2,
            random_jitter_range: Duration::ZERO,
        }
        .build();
        assert_eq!(strategy.backoff(0), Duration::from_secs(1));
        assert_eq!(strategy.backoff(3), Duration::from_secs(9));
    }
}
