use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

/// Retries `f` with exponential backoff, but only for errors the
/// `is_retryable` predicate accepts; any other error is returned to the
/// caller on first occurrence.
pub async fn retry_if<F, Fut, T, E, P>(config: &RetryConfig, is_retryable: P, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= config.max_attempts || !is_retryable(&e) {
                    return Err(e);
                }
                tracing::warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                let next = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_factor);
                delay = next.min(config.max_delay);
            }
        }
    }
}

/// Convenience wrapper for call sites where every error is worth retrying.
pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(config, |_| true, f).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_factor: 1.0,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_try() {
        let result = retry_async(&fast_config(3), || async { Ok::<_, &str>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn succeeds_after_retries() {
        let counter = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_async(&fast_config(3), || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err("not yet")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn fails_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let result: Result<(), &str> = retry_async(&fast_config(2), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_aborts_immediately() {
        let counter = AtomicU32::new(0);
        let result: Result<(), &str> = retry_if(
            &fast_config(5),
            |e: &&str| *e == "conflict",
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("permission denied") }
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), "permission denied");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_only_while_predicate_matches() {
        let counter = AtomicU32::new(0);
        let result: Result<(), String> = retry_if(
            &fast_config(5),
            |e: &String| e == "conflict",
            || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        Err("conflict".to_string())
                    } else {
                        Err("gone".to_string())
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), "gone");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
