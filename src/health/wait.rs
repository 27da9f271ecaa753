//! Bounded exponential backoff health check

use super::context::AttemptContext;
use super::policy::{next_backoff, RetryPolicy};
use crate::metrics::labels::{OUTCOME_FAILURE, OUTCOME_SUCCESS};
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Poll `probe` until it succeeds or the policy's attempt budget runs out
///
/// Attempts run one after another. Each attempt gets an [`AttemptContext`]
/// whose token is a child of `parent` and whose deadline is the current
/// backoff; the probe future is dropped when either fires. The backoff doubles
/// after every failure up to the policy's cap. There is no sleep between
/// attempts: the attempt timeout is the wait.
///
/// After the last failed attempt the error from that attempt is returned as-is.
/// Cancelling `parent` makes every remaining attempt fail immediately with
/// [`Error::Cancelled`].
pub async fn wait_for<F, Fut>(
    parent: &CancellationToken,
    policy: &RetryPolicy,
    mut probe: F,
) -> Result<()>
where
    F: FnMut(AttemptContext) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut backoff = policy.initial_backoff().min(policy.max_backoff());
    let mut last_err = Error::Config("no attempts configured".into());

    for attempt in 1..=policy.max_attempts() {
        let token = parent.child_token();
        // cancels the attempt token on every exit path, unwinding included
        let _guard = token.clone().drop_guard();
        let ctx = AttemptContext::new(attempt, backoff, token);

        match ctx.run(probe(ctx.clone())).await {
            Ok(()) => {
                crate::metrics::counters::health_check_attempt(OUTCOME_SUCCESS, "none");
                crate::metrics::histograms::health_check_attempts_used(OUTCOME_SUCCESS, attempt);
                tracing::info!(attempt, "health check passed");
                return Ok(());
            }
            Err(err) => {
                crate::metrics::counters::health_check_attempt(OUTCOME_FAILURE, err.category());
                tracing::debug!(
                    attempt,
                    max_attempts = policy.max_attempts(),
                    backoff = ?backoff,
                    error = %err,
                    "health check attempt failed"
                );
                last_err = err;
                backoff = next_backoff(backoff, policy.max_backoff());
            }
        }
    }

    crate::metrics::counters::health_check_exhausted(last_err.category());
    crate::metrics::histograms::health_check_attempts_used(OUTCOME_FAILURE, policy.max_attempts());
    tracing::warn!(
        attempts = policy.max_attempts(),
        error = %last_err,
        "health check gave up"
    );
    Err(last_err)
}

/// [`wait_for`] with the policy given as loose parameters
///
/// A zero attempt budget or zero initial backoff is rejected with
/// [`Error::Config`] before the probe is ever invoked.
pub async fn wait_for_with<F, Fut>(
    parent: &CancellationToken,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_attempts: u32,
    probe: F,
) -> Result<()>
where
    F: FnMut(AttemptContext) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let policy = RetryPolicy::new(initial_backoff, max_backoff, max_attempts)?;
    wait_for(parent, &policy, probe).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_budget() {
        let calls = AtomicU32::new(0);
        let parent = CancellationToken::new();

        let result = wait_for_with(&parent, secs(1), secs(4), 3, |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(Error::Probe(format!("refused #{}", n))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(Error::Probe(msg)) if msg == "refused #3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let parent = CancellationToken::new();

        let result = wait_for_with(&parent, secs(1), secs(4), 5, |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err(Error::Probe("not ready".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeouts_grow_then_clamp() {
        let seen = Mutex::new(Vec::new());
        let parent = CancellationToken::new();

        let _ = wait_for_with(&parent, secs(1), secs(4), 5, |ctx| {
            seen.lock().unwrap().push((ctx.attempt(), ctx.timeout()));
            async { Err(Error::Probe("down".into())) }
        })
        .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                (1, secs(1)),
                (2, secs(2)),
                (3, secs(4)),
                (4, secs(4)),
                (5, secs(4))
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_probe_is_bounded_by_backoff() {
        let parent = CancellationToken::new();
        let start = Instant::now();

        let result = wait_for_with(&parent, secs(1), secs(4), 3, |_ctx| {
            std::future::pending::<Result<()>>()
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout(d)) if d == secs(4)));
        assert_eq!(start.elapsed(), secs(1 + 2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_success_within_window() {
        let parent = CancellationToken::new();
        let start = Instant::now();

        let result = wait_for_with(&parent, secs(2), secs(4), 3, |_ctx| async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            Ok(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_parent_returns_promptly() {
        let parent = CancellationToken::new();
        parent.cancel();
        let start = Instant::now();

        let result = wait_for_with(&parent, secs(1), secs(10), 10, |_ctx| {
            std::future::pending::<Result<()>>()
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_attempt() {
        let parent = CancellationToken::new();
        let canceller = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });
        let start = Instant::now();

        let result = wait_for_with(&parent, secs(1), secs(10), 10, |_ctx| {
            std::future::pending::<Result<()>>()
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_zero_attempts_never_probes() {
        let calls = AtomicU32::new(0);
        let parent = CancellationToken::new();

        let result = wait_for_with(&parent, secs(1), secs(4), 0, |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attempt_token_released_on_success() {
        let parent = CancellationToken::new();
        let captured = Mutex::new(None);

        wait_for(&parent, &RetryPolicy::default(), |ctx| {
            *captured.lock().unwrap() = Some(ctx.token().clone());
            async { Ok(()) }
        })
        .await
        .unwrap();

        let token = captured.into_inner().unwrap().unwrap();
        assert!(token.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_attempt_token_released_on_panic() {
        let parent = CancellationToken::new();
        let captured: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let slot = captured.clone();

        let handle = tokio::spawn(async move {
            wait_for(&parent, &RetryPolicy::default(), move |ctx| {
                *slot.lock().unwrap() = Some(ctx.token().clone());
                async move {
                    if ctx.attempt() == 1 {
                        panic!("probe panicked");
                    }
                    Ok(())
                }
            })
            .await
        });

        assert!(handle.await.is_err());
        let token = captured.lock().unwrap().take().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_can_read_remaining_time() {
        let parent = CancellationToken::new();

        let result = wait_for_with(&parent, secs(3), secs(3), 1, |ctx| async move {
            if ctx.remaining() == secs(3) {
                Ok(())
            } else {
                Err(Error::Probe("unexpected remaining time".into()))
            }
        })
        .await;

        tokio_test::assert_ok!(result);
    }
}
