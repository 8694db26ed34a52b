//! Background expiry sweep for the session table.
//!
//! The pure logic lives in [`SessionManager::clear_expired`] with an
//! injected clock; this is the scheduled wrapper around it, with a
//! cancellable shutdown handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::manager::SessionManager;

/// Periodically removes sessions idle past their time-to-live.
pub struct SessionSweeper {
    manager: Arc<SessionManager>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl SessionSweeper {
    /// Create a sweeper over the given manager, sweeping every `interval`.
    pub fn new(manager: Arc<SessionManager>, interval: Duration) -> Self {
        Self {
            manager,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run the sweep loop. Returns on shutdown signal.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "session sweeper started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.manager.clear_expired(Utc::now()) {
                        Ok(0) => {}
                        Ok(removed) => info!(removed, "session sweep reclaimed state"),
                        Err(e) => warn!(error = %e, "session sweep failed"),
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("session sweeper stopped");
                    return;
                }
            }
        }
    }

    /// Signal the sweeper to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
