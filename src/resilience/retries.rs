//! Retry logic.
//!
//! # Responsibilities
//! - Run an operation under a total time budget
//! - Retry it when the store reports a transient timeout, up to a fixed count
//! - Surface non-transient errors immediately
//!
//! # Design Decisions
//! - No backoff sleep: the budget is tiny and any sleep would eat into it
//! - Every attempt may use all of what is left of the budget; a slow answer
//!   that fits the budget is never cut short

use std::future::Future;
use std::time::Duration;

use crate::resilience::timeouts::Deadline;
use crate::store::{StoreError, StoreResult};

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// budget and retry count are exhausted.
///
/// `retries` counts attempts after the first, so `retries = 2` allows three
/// attempts in total. Only a `StoreError::Timeout` reported by the operation
/// itself is retried. Exhausting the budget yields [`StoreError::Timeout`].
pub async fn retry_on_timeout<T, F, Fut>(budget: Duration, retries: u32, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let deadline = Deadline::after(budget);
    let attempts = retries.saturating_add(1);

    for attempt in 1..=attempts {
        if deadline.is_elapsed() {
            break;
        }
        match tokio::time::timeout(deadline.remaining(), op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_transient() => {
                tracing::debug!(attempt, error = %e, "Store attempt timed out, retrying");
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::debug!(attempt, "Store read exceeded its budget");
                break;
            }
        }
    }

    Err(StoreError::Timeout)
}
