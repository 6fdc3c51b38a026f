//! Retry logic with exponential backoff.
//!
//! Unary calls are retried with the `backon` crate according to the client's
//! [`RetryPolicy`]. Only transport failures and statuses whose code is in
//! [`RetryPolicy::retryable_codes`] are retried. Subscriptions are never retried.

use std::{
    future::Future,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use backon::{ExponentialBuilder, Retryable};
use rand::Rng;
use snafu::{IntoError, ensure};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RetryPolicy,
    error::{DisposedSnafu, Result, RetryExhaustedSnafu, SdkError},
};

/// Executes an async operation, retrying transient failures with exponential backoff.
///
/// # Retry Strategy
///
/// - **Exponential backoff**: `initial_backoff * multiplier^(attempt-1)`
/// - **Jitter**: ±`jitter` randomness applied to every sleep
/// - **Cap**: Backoff capped at `max_backoff`
/// - **Termination**: After `max_attempts` failed attempts
///
/// Non-retryable errors are returned as they are. When every attempt of a
/// multi-attempt policy fails, the last error is reported as the source of
/// [`SdkError::RetryExhausted`].
///
/// # Example
///
/// ```ignore
/// use orisun_sdk::{with_retry, RetryPolicy, SdkError};
///
/// let policy = RetryPolicy::default();
/// let result = with_retry(&policy, "get events", || async {
///     Ok::<_, SdkError>("success")
/// }).await;
/// ```
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_cancellable(policy, &CancellationToken::new(), operation, op).await
}

/// Like [`with_retry`], but stops as soon as `token` is cancelled.
///
/// Every attempt and every backoff sleep race the token. Once it fires, no
/// further attempt starts and [`SdkError::Disposed`] is returned.
pub async fn with_retry_cancellable<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    operation: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    ensure!(!token.is_cancelled(), DisposedSnafu);

    // backon counts retries, not attempts.
    let max_retries = policy.max_attempts.saturating_sub(1) as usize;

    let backoff = ExponentialBuilder::new()
        .with_min_delay(policy.initial_backoff)
        .with_max_delay(policy.max_backoff)
        .with_factor(policy.multiplier as f32)
        .with_max_times(max_retries);

    let retries = AtomicU32::new(0);
    let jitter = policy.jitter;
    let sleep_token = token.clone();

    let run = move || {
        let fut = op();
        async move {
            tokio::select! {
                biased;
                () = token.cancelled() => DisposedSnafu.fail(),
                result = fut => result,
            }
        }
    };

    run.retry(backoff)
        .sleep(move |dur: Duration| {
            let token = sleep_token.clone();
            async move {
                tokio::select! {
                    () = token.cancelled() => {},
                    () = tokio::time::sleep(apply_jitter(dur, jitter)) => {},
                }
            }
        })
        .when(|e: &SdkError| is_retryable_under(policy, e))
        .notify(|err: &SdkError, dur: Duration| {
            let attempt = retries.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(
                operation,
                attempt,
                backoff_ms = dur.as_millis() as u64,
                error = %err,
                "retrying after backoff"
            );
        })
        .await
        .map_err(|e| {
            let attempts = retries.load(Ordering::SeqCst) + 1;
            if attempts > 1 && is_retryable_under(policy, &e) {
                RetryExhaustedSnafu { attempts }.into_error(e)
            } else {
                e
            }
        })
}

/// Returns true if `err` should be retried under `policy`.
fn is_retryable_under(policy: &RetryPolicy, err: &SdkError) -> bool {
    match err {
        SdkError::Transport { .. } => true,
        SdkError::Rpc { code, .. } => policy.retries_code(*code),
        _ => false,
    }
}

/// Apply jitter to a duration.
///
/// Jitter adds randomness in the range `[dur * (1 - factor), dur * (1 + factor)]`
/// so that clients failing together do not retry together.
fn apply_jitter(dur: Duration, factor: f64) -> Duration {
    if factor <= 0.0 {
        return dur;
    }

    let factor = factor.clamp(0.0, 1.0);
    let mut rng = rand::rng();

    let base_nanos = dur.as_nanos() as f64;
    let min_nanos = base_nanos * (1.0 - factor);
    let max_nanos = base_nanos * (1.0 + factor);

    let jittered_nanos = rng.random_range(min_nanos..=max_nanos);
    Duration::from_nanos(jittered_nanos as u64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use std::sync::Arc;

    use tonic::{Code, metadata::MetadataMap};

    use super::*;

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: 0.0,
            ..RetryPolicy::default()
        }
    }

    fn status(code: Code) -> SdkError {
        SdkError::Rpc { code, message: "failed".to_owned(), metadata: MetadataMap::new() }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = with_retry(&test_policy(), "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SdkError>("success")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_unavailable() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = with_retry(&test_policy(), "op", || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(status(Code::Unavailable))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = with_retry(&test_policy(), "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(Code::Unknown))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            SdkError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, SdkError::Rpc { code: Code::Unknown, .. }));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_code_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = with_retry(&test_policy(), "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(Code::InvalidArgument))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().code(), Some(Code::InvalidArgument));
    }

    #[tokio::test]
    async fn test_single_attempt_policy_returns_original_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = with_retry(&RetryPolicy::no_retry(), "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(Code::Unavailable))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), SdkError::Rpc { code: Code::Unavailable, .. }));
    }

    #[tokio::test]
    async fn test_custom_retryable_codes() {
        let policy =
            RetryPolicy { retryable_codes: vec![Code::Aborted], ..test_policy() };
        let calls = Arc::new(AtomicU32::new(0));

        let _: Result<()> = with_retry(&policy, "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(Code::Unavailable))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<()> = with_retry_cancellable(&test_policy(), &token, "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), SdkError::Disposed));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_stops_retrying() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(5),
            ..test_policy()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
            })
        };

        let started = std::time::Instant::now();
        let result: Result<()> = with_retry_cancellable(&policy, &token, "op", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(Code::Unavailable))
            }
        })
        .await;
        canceller.await.unwrap();

        assert!(matches!(result.unwrap_err(), SdkError::Disposed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_apply_jitter_bounds() {
        let base = Duration::from_millis(100);
        for _ in 0..100 {
            let jittered = apply_jitter(base, 0.1);
            assert!(jittered >= Duration::from_millis(90));
            assert!(jittered <= Duration::from_millis(110));
        }
        assert_eq!(apply_jitter(base, 0.0), base);
    }
}
