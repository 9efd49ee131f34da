//! Retry back-off policy
//!
//! The policy only computes delays; it never sleeps. Keeping the clock out
//! of the policy keeps it unit-testable without real time passing.

use std::time::Duration;

/// Default cap on the computed delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Back-off strategy contract
///
/// Call [`failure`](BackOffStrategy::failure) after each failed attempt and
/// [`reset`](BackOffStrategy::reset) after a success. The caller is
/// responsible for sleeping [`current_delay`](BackOffStrategy::current_delay).
pub trait BackOffStrategy: Send {
    /// Record a failed attempt
    fn failure(&mut self);

    /// Record a success and restore the initial delay
    fn reset(&mut self);

    /// Current delay to wait before the next attempt
    fn current_delay(&self) -> Duration;
}

/// Exponential back-off strategy
///
/// The delay doubles on each failure, starting at one second, and is capped
/// at `max_delay` when read. The stored delay itself is unbounded so the
/// sequence stays monotonic between resets.
#[derive(Debug)]
pub struct ExponentialBackOff {
    delay_secs: u64,
    pub max_delay: Duration,
}

impl ExponentialBackOff {
    /// Create an exponential back-off with the default 60 second cap
    pub fn new() -> Self {
        Self {
            delay_secs: 0,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Create an exponential back-off with an explicit cap
    pub fn with_max_delay(max_delay: Duration) -> Self {
        Self {
            delay_secs: 0,
            max_delay,
        }
    }
}

impl Default for ExponentialBackOff {
    fn default() -> Self {
        Self::new()
    }
}

impl BackOffStrategy for ExponentialBackOff {
    fn failure(&mut self) {
        self.delay_secs = if self.delay_secs == 0 {
            1
        } else {
            self.delay_secs.saturating_mul(2)
        };
    }

    fn reset(&mut self) {
        self.delay_secs = 0;
    }

    fn current_delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs).min(self.max_delay)
    }
}
