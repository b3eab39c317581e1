//! Bounded transparent retry for concurrency conflicts.

use std::future::Future;

use lotledger_core::{LedgerError, LedgerResult};

/// Attempts per operation before a conflict is surfaced to the caller.
const MAX_ATTEMPTS: u32 = 3;

/// Run `op` until it succeeds, fails with a non-retryable error, or exhausts
/// `MAX_ATTEMPTS`. Only `ConcurrencyConflict` is retried; business failures
/// (validation, availability, state) are deterministic and surface at once.
pub(crate) async fn with_retry<T, F, Fut>(operation: &str, mut op: F) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %err,
                    "retrying after concurrency conflict"
                );
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn conflicts_are_retried_up_to_the_bound() {
        let calls = AtomicU32::new(0);
        let result: LedgerResult<()> = with_retry("op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::conflict("busy")) }
        })
        .await;
        assert!(matches!(result, Err(LedgerError::ConcurrencyConflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn business_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: LedgerResult<()> = with_retry("op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::validation("bad")) }
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_a_conflict_is_returned() {
        let calls = AtomicU32::new(0);
        let result = with_retry("op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LedgerError::conflict("busy"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
