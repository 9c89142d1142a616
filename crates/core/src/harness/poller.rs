//! Fixed-interval polling of a remote condition with a hard deadline.

use log::debug;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// Default delay between two checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PollError<E>
where
    E: std::error::Error + 'static,
{
    #[error("condition not met within {timeout:?} (elapsed {elapsed:?})")]
    Timeout { timeout: Duration, elapsed: Duration },

    /// The check itself failed. Transport errors are not retried here.
    #[error("condition check failed: {0}")]
    Check(#[source] E),
}

impl<E> PollError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// How often to check and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Default interval with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, timeout)
    }
}

/// Re-run `check` until it reports `true`, it fails, or the deadline passes.
///
/// The first check runs immediately. Callers are expected to re-fetch and
/// assert the final state themselves once this returns `Ok`.
pub async fn poll_until<F, Fut, E>(settings: PollSettings, mut check: F) -> Result<(), PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + 'static,
{
    poll_for(settings, move || {
        let fut = check();
        async move { fut.await.map(|met| met.then_some(())) }
    })
    .await
}

/// Like [`poll_until`], but the check hands back a value once satisfied.
pub async fn poll_for<T, F, Fut, E>(settings: PollSettings, mut check: F) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: std::error::Error + 'static,
{
    let started = Instant::now();
    let deadline = started + settings.timeout;
    let mut checks = 0u64;

    loop {
        checks += 1;
        if let Some(value) = check().await.map_err(PollError::Check)? {
            debug!("Condition met after {} check(s) in {:?}", checks, started.elapsed());
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::Timeout {
                timeout: settings.timeout,
                elapsed: now - started,
            });
        }

        sleep(settings.interval.min(deadline - now)).await;

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::Timeout {
                timeout: settings.timeout,
                elapsed: now - started,
            });
        }
    }
}
