//! Backoff strategy trait.

use std::fmt;
use std::time::Duration;

/// Trait for computing the delay before a retry.
pub trait BackoffStrategy: Send + Sync + fmt::Debug {
    /// Delay before the retry numbered `attempt_count`.
    ///
    /// The retry policy increments its counter before sleeping, so the first
    /// retry asks for `attempt_count == 1`.
    fn backoff(&self, attempt_count: u32) -> Duration;
}

/// Strategy that never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl NoBackoff {
    /// Create a new no-wait strategy.
    pub fn new() -> Self {
        Self
    }
}

impl BackoffStrategy for NoBackoff {
    fn backoff(&self, _attempt_count: u32) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_backoff() {
        let strategy = NoBackoff::new();
        assert_eq!(strategy.backoff(0), Duration::ZERO);
        assert_eq!(strategy.backoff(7), Duration::ZERO);
    }
}
