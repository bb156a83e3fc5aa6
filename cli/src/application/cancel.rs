//! Caller-owned cancellation signal threaded through every wait.
//!
//! A [`CancelHandle`] fires once; every [`Cancellation`] clone observes it.
//! Waits race the signal and return [`Cancelled`] when it wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;

use crate::domain::error::Cancelled;

/// Fires the cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes the cancellation signal.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, Self { rx })
    }

    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // The receiver keeps reporting `false` once the sender is gone.
        drop(tx);
        Self { rx }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fails fast if the signal has already fired.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Cancelled.into());
        }
        Ok(())
    }

    /// Resolves when the signal fires. Pending forever for [`Cancellation::never`].
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the signal fires before the sleep ends.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.race(tokio::time::sleep(duration)).await
    }

    /// Runs `fut` to completion unless cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the signal fires first; `fut` is dropped.
    pub async fn race<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Cancelled.into()),
            value = fut => Ok(value),
        }
    }
}
