//! Cooperative shutdown signal.
//!
//! A lightweight, cloneable handle shared by the scan loop, the scheduler
//! loop and the keyboard and Ctrl-C listeners. Any holder can request a stop;
//! every holder can poll it or await it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// A handle to request and observe shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    stop_signal: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Create a new handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            stop_signal: Arc::new(tx),
        }
    }

    /// Signal every holder to stop.
    pub fn stop(&self, reason: &str) {
        if !self.stop_signal.send_replace(true) {
            debug!(reason, "Shutdown requested");
        }
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        *self.stop_signal.borrow()
    }

    /// Wait until the stop signal is sent.
    pub async fn stopped(&self) {
        let mut rx = self.stop_signal.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}
