//! Retry policy for health checks

use crate::{Error, Result};
use std::time::Duration;

/// Default attempt budget
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default first-attempt timeout
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Default timeout cap
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Bounded exponential backoff
///
/// Attempt `i` (1-based) is given `min(initial_backoff * 2^(i-1), max_backoff)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial_backoff: Duration,
    max_backoff: Duration,
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a validated policy
    ///
    /// Requires at least one attempt and a non-zero initial backoff.
    pub fn new(
        initial_backoff: Duration,
        max_backoff: Duration,
        max_attempts: u32,
    ) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config(
                "retry policy must allow at least one attempt".into(),
            ));
        }
        if initial_backoff.is_zero() {
            return Err(Error::Config("initial backoff must be non-zero".into()));
        }
        Ok(Self {
            initial_backoff,
            max_backoff,
            max_attempts,
        })
    }

    /// First-attempt timeout
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Timeout cap
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Attempt budget
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Timeout for the given 1-based attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff.min(self.max_backoff);
        for _ in 1..attempt {
            backoff = next_backoff(backoff, self.max_backoff);
            if backoff == self.max_backoff {
                break;
            }
        }
        backoff
    }

    /// Per-attempt timeouts, one per attempt in the budget
    pub fn schedule(&self) -> Schedule {
        Schedule {
            next: self.initial_backoff,
            max: self.max_backoff,
            remaining: self.max_attempts,
        }
    }

    /// Worst-case total time spent waiting on probes
    pub fn worst_case(&self) -> Duration {
        self.schedule()
            .fold(Duration::ZERO, |total, b| total.saturating_add(b))
    }
}

/// Double `current`, clamped to `max`
pub(crate) fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

/// Iterator over per-attempt timeouts
#[derive(Debug, Clone)]
pub struct Schedule {
    next: Duration,
    max: Duration,
    remaining: u32,
}

impl Iterator for Schedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next.min(self.max);
        self.next = next_backoff(current, self.max);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Schedule {}
