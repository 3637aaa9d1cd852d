//! Deadline-bounded retry for remote calls.
//!
//! Every gateway operation against the search engine runs under
//! [`with_deadline`]: invoke the operation, and on a transient error sleep
//! a fixed backoff and try again, until an overall wall-clock deadline
//! elapses. The deadline is tracked with [`tokio::time::Instant`], so it
//! is monotonic and immune to system clock adjustments.
//!
//! This is deliberately a fixed-backoff loop, not exponential backoff with
//! jitter: the portal's call volume is a handful of requests per second at
//! most, and a constant interval keeps the worst-case attempt count easy
//! to reason about.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::GatewayError;

/// Run `op` until it succeeds, fails permanently, or `deadline` elapses.
///
/// Transient errors (see [`GatewayError::is_transient`]) sleep `backoff`
/// and retry; the first non-transient error propagates untouched. When the
/// deadline elapses the result is [`GatewayError::DeadlineExceeded`]
/// wrapping the last transient error observed, so the cause of the stall
/// survives into logs and responses.
pub async fn with_deadline<T, F, Fut>(
    deadline: Duration,
    backoff: Duration,
    mut op: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let started = Instant::now();

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if started.elapsed() >= deadline {
                    return Err(GatewayError::DeadlineExceeded {
                        deadline_ms: deadline.as_millis() as u64,
                        source: Box::new(err),
                    });
                }
                tracing::warn!(error = %err, backoff_ms = backoff.as_millis() as u64, "transient failure, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
