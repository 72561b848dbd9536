//! Retry policy shared by components that want retry semantics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "strategy")]
pub enum Backoff {
    /// No pause between attempts.
    None,
    /// The same pause before every retry.
    Fixed {
        /// Pause duration.
        delay: Duration,
    },
    /// Pause grows by `multiplier` with each attempt.
    Exponential {
        /// Pause before the first retry.
        initial: Duration,
        /// Growth factor applied per attempt.
        multiplier: f64,
    },
}

/// How many times to attempt an operation and how long to wait in between.
///
/// `max_attempts` counts the initial attempt, so `max_attempts == 1` means
/// no retries at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause strategy between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self { max_attempts: 1, backoff: Backoff::None }
    }

    /// A policy that retries exactly once, immediately.
    #[must_use]
    pub const fn retry_once() -> Self {
        Self { max_attempts: 2, backoff: Backoff::None }
    }

    /// A fixed-delay policy with the given total attempts.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::Fixed { delay } }
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    #[must_use]
    pub const fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// The pause before retry attempt `attempt` (1-based retry index).
    ///
    /// Returns `Duration::ZERO` for [`Backoff::None`].
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { initial, multiplier } => {
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                initial.mul_f64(factor.max(0.0))
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
