//! Backoff strategies.
//!
//! Both strategies randomize the computed interval uniformly within
//! `random_jitter_range` on either side, never going below zero.

use crate::strategy::BackoffStrategy;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter.
///
/// The first retry waits `initial_backoff`; retry `n` waits
/// `initial_backoff + increment_base^n` seconds. With the defaults that is
/// 15, 18, 24 seconds (before jitter).
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Base interval.
    pub initial_backoff: Duration,
    /// Base, in seconds, raised to the attempt count.
    pub increment_base: u32,
    /// Jitter applied on either side of the interval.
    pub random_jitter_range: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(15),
            increment_base: 3,
            random_jitter_range: Duration::from_secs(3),
        }
    }
}

impl ExponentialBackoff {
    /// Create a new exponential backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Interval for an attempt, before jitter.
    pub fn base_delay(&self, attempt_count: u32) -> Duration {
        let increment = if attempt_count == 0 {
            0.0
        } else {
            let exponent = i32::try_from(attempt_count).unwrap_or(i32::MAX);
            f64::from(self.increment_base).powi(exponent)
        };
        saturating_secs(self.initial_backoff.as_secs_f64() + increment)
    }

    /// Jittered interval for an attempt using the given random source.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, attempt_count: u32, rng: &mut R) -> Duration {
        jittered(self.base_delay(attempt_count), self.random_jitter_range, rng)
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn backoff(&self, attempt_count: u32) -> Duration {
        self.delay_with_rng(attempt_count, &mut rand::thread_rng())
    }
}

/// Builder for ExponentialBackoff.
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    initial_backoff: Option<Duration>,
    increment_base: Option<u32>,
    random_jitter_range: Option<Duration>,
}

impl ExponentialBackoffBuilder {
    /// Set the base interval.
    #[must_use]
    pub fn initial_backoff(mut self, d: Duration) -> Self {
        self.initial_backoff = Some(d);
        self
    }

    /// Set the increment base.
    #[must_use]
    pub fn increment_base(mut self, base: u32) -> Self {
        self.increment_base = Some(base);
        self
    }

    /// Set the jitter range.
    #[must_use]
    pub fn random_jitter_range(mut self, d: Duration) -> Self {
        self.random_jitter_range = Some(d);
        self
    }

    /// Build the backoff strategy.
    #[must_use]
    pub fn build(self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff::default();
        if let Some(v) = self.initial_backoff {
            backoff.initial_backoff = v;
        }
        if let Some(v) = self.increment_base {
            backoff.increment_base = v;
        }
        if let Some(v) = self.random_jitter_range {
            backoff.random_jitter_range = v;
        }
        backoff
    }
}

/// Fixed interval with jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearBackoff {
    /// Interval between retries.
    pub backoff: Duration,
    /// Jitter applied on either side of the interval.
    pub random_jitter_range: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(15),
            random_jitter_range: Duration::from_secs(3),
        }
    }
}

impl LinearBackoff {
    /// Create a new linear backoff.
    #[must_use]
    pub fn new(backoff: Duration, random_jitter_range: Duration) -> Self {
        Self {
            backoff,
            random_jitter_range,
        }
    }

    /// Jittered interval using the given random source.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        jittered(self.backoff, self.random_jitter_range, rng)
    }
}

impl BackoffStrategy for LinearBackoff {
    fn backoff(&self, _attempt_count: u32) -> Duration {
        self.delay_with_rng(&mut rand::thread_rng())
    }
}

/// Draw uniformly from `[backoff - jitter, backoff + jitter]`.
///
/// The lower bound is zero when `backoff <= jitter`.
fn jittered<R: Rng + ?Sized>(backoff: Duration, jitter: Duration, rng: &mut R) -> Duration {
    let backoff = backoff.as_secs_f64();
    let jitter = jitter.as_secs_f64();
    let start = if backoff > jitter {
        backoff - jitter
    } else {
        0.0
    };
    let end = backoff + jitter;
    if end <= start {
        return saturating_secs(start);
    }
    saturating_secs(rng.gen_range(start..=end))
}

/// Seconds to a `Duration`, saturating at `Duration::MAX`.
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
