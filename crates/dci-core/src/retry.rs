// ── Bounded retries for idempotent calls ──

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::CoreError;

/// Run `op` up to `attempts` times (at least once), sleeping `backoff`
/// between tries. Only transient errors are retried; the last error is
/// returned to the caller.
///
/// Use only for reads and deletes that are safe to repeat.
pub async fn retry_idempotent<T, F, Fut>(
    what: &str,
    attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(what, attempt, attempts, error = %e, "transient failure, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn transient() -> CoreError {
        CoreError::Transport {
            message: "reset".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let v = retry_idempotent("x", 3, Duration::from_secs(2), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(v, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = retry_idempotent::<(), _, _>("x", 2, Duration::from_secs(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await
        .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = retry_idempotent::<(), _, _>("x", 5, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Validation {
                message: "no".into(),
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
