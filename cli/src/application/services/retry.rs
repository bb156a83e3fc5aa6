//! Bounded retry with a fixed delay, for eventually-consistent cloud calls.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::application::cancel::Cancellation;
use crate::domain::error::is_cancelled;

/// Fixed-attempt, fixed-delay retry. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Invokes `op` until it succeeds or the attempt budget is spent.
    ///
    /// A cancellation error is returned immediately and never retried. The
    /// delay between attempts also observes `cancel`.
    ///
    /// # Errors
    ///
    /// Returns the last error once every attempt failed, or `Cancelled`.
    pub async fn run<T, F, Fut>(&self, cancel: &Cancellation, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_cancelled(&e) => return Err(e),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::debug!(attempt, error = %format!("{e:#}"), "retrying");
                    cancel.sleep(self.delay).await?;
                    attempt += 1;
                }
            }
        }
    }
}
