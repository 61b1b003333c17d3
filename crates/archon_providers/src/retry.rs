//! Retry with exponential backoff: 1s, 2s, 4s, capped at 3 attempts,
//! applied on rate-limit or transient errors (spec §4.3).

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

const BACKOFFS_MS: [u64; 3] = [1000, 2000, 4000];

pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut last_err = None;
    for (attempt, backoff_ms) in BACKOFFS_MS.iter().enumerate() {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => {
                last_err = Some(e);
                if attempt + 1 == BACKOFFS_MS.len() {
                    break;
                }
                tracing::debug!(attempt, backoff_ms, error = %last_err.as_ref().unwrap(), "provider call failed, retrying");
                tokio::time::sleep(Duration::from_millis(*backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.expect("loop body always sets last_err before breaking or falling through"))
}

fn is_retryable(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::RateLimited(_) | ProviderError::Timeout(_) | ProviderError::Unavailable(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Unavailable("flaky".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_at_exactly_three_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), ProviderError> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Unavailable("down".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), ProviderError> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::MissingApiKey("openai".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
