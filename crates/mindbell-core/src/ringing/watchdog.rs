//! Bounded wait for ring completion.
//!
//! A ring may never report completion (backend failure, device gone), so
//! callers that must not return before the ring is resolved wait through a
//! [`Watchdog`]: whichever comes first of completion, cancellation or the
//! timeout ends the wait.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Notify};

pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchOutcome {
    Completed,
    /// Timeout elapsed first. Not a playback failure.
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    cancel: Arc<Notify>,
}

/// Ends a pending [`Watchdog::wait`] early.
#[derive(Debug, Clone)]
pub struct WatchdogCancel(Arc<Notify>);

impl WatchdogCancel {
    /// A cancel issued before the wait starts is kept and ends it at once.
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancel_handle(&self) -> WatchdogCancel {
        WatchdogCancel(self.cancel.clone())
    }

    /// Wait for `done`. A dropped sender never counts as completion; the
    /// wait then runs on to the timeout.
    pub async fn wait(&self, done: oneshot::Receiver<()>) -> WatchOutcome {
        let completed = async {
            if done.await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            biased;
            _ = completed => WatchOutcome::Completed,
            _ = self.cancel.notified() => WatchOutcome::Cancelled,
            _ = tokio::time::sleep(self.timeout) => {
                tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "ring watchdog timed out");
                WatchOutcome::TimedOut
            }
        }
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_WATCHDOG_TIMEOUT)
    }
}
