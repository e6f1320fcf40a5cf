//! Suspension points of the session flow.
//!
//! Every wait (port call, text generation, backoff, rate limiting) goes
//! through here so the abort signal is observed at each one.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Why a guarded call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt<E> {
    Cancelled,
    TimedOut,
    Failed(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Runs `fut` bounded by `limit`, abandoning it as soon as `cancel` fires.
pub async fn guarded<T, E, F>(
    cancel: &CancellationToken,
    limit: Duration,
    fut: F,
) -> Result<T, Interrupt<E>>
where
    F: Future<Output = Result<T, E>>,
{
    if cancel.is_cancelled() {
        return Err(Interrupt::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        res = tokio::time::timeout(limit, fut) => match res {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Interrupt::Failed(err)),
            Err(_) => Err(Interrupt::TimedOut),
        },
    }
}

/// Sleeps for `duration` unless cancelled first.
pub async fn pause(cancel: &CancellationToken, duration: Duration) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
