//! Per-attempt context handed to health-check probes

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// roughly 30 years, the same horizon tokio uses for unbounded sleeps
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Bounded context for a single probe attempt
///
/// Carries the attempt's deadline and a cancellation token derived from the
/// caller's parent token. The token is cancelled when the attempt ends, so
/// work spawned from it does not outlive the attempt.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    attempt: u32,
    timeout: Duration,
    deadline: Instant,
    token: CancellationToken,
}

impl AttemptContext {
    /// Create a context with `timeout` measured from now
    ///
    /// Timeouts too large to represent as an instant are treated as unbounded.
    pub fn new(attempt: u32, timeout: Duration, token: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            attempt,
            timeout,
            deadline: now.checked_add(timeout).unwrap_or(now + FAR_FUTURE),
            token,
        }
    }

    /// Standalone context with its own token, for one-off calls outside `wait_for`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(1, timeout, CancellationToken::new())
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Timeout this attempt was given
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Instant at which the attempt expires
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the attempt (or its parent) was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the attempt is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Token for this attempt
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Run `fut`, bounded by this context's deadline and cancellation
    ///
    /// Returns [`Error::Cancelled`] if the token fires first and
    /// [`Error::Timeout`] if the deadline passes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => {
                res.unwrap_or(Err(Error::Timeout(self.timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down() {
        let ctx = AttemptContext::with_timeout(Duration::from_secs(2));
        assert_eq!(ctx.remaining(), Duration::from_secs(2));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(ctx.remaining(), Duration::from_millis(1500));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let ctx = AttemptContext::with_timeout(Duration::from_secs(1));
        let result: Result<()> = ctx.run(std::future::pending()).await;
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_run_returns_inner_result() {
        let ctx = AttemptContext::with_timeout(Duration::from_secs(1));
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = ctx
            .run::<(), _>(async { Err(Error::Probe("boom".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let ctx = AttemptContext::with_timeout(Duration::MAX);
        assert_eq!(ctx.timeout(), Duration::MAX);
        assert!(ctx.remaining() > Duration::from_secs(86400 * 365));
        assert_eq!(ctx.run(async { Ok(1) }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_observes_cancellation() {
        let parent = CancellationToken::new();
        let ctx = AttemptContext::new(1, Duration::from_secs(60), parent.child_token());
        parent.cancel();

        assert!(ctx.is_cancelled());
        let result: Result<()> = ctx.run(std::future::pending()).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
