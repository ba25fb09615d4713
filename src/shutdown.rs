//! Graceful Shutdown Handling
//!
//! Both the server and client loops run until their `running` flag is
//! cleared. `ShutdownSignal` carries that flag together with a wakeup so a
//! loop parked in its readiness wait reacts to `stop()` immediately instead
//! of waiting out the idle timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::Result;

/// Cooperative stop flag shared between a loop and its external owner.
///
/// Clones refer to the same underlying flag. `stop()` is idempotent.
#[derive(Clone)]
pub struct ShutdownSignal {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    /// Create a new signal in the running state
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Whether the owning loop should keep running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Request the owning loop to stop. Safe to call more than once.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            debug!("Stop requested");
        }
        self.notify.notify_waiters();
    }

    /// Resolve once `stop()` has been called.
    ///
    /// Interest is registered before the flag check so a `stop()` racing
    /// this call is never missed.
    pub async fn stopped(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.is_running() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Listen for SIGTERM/SIGINT and forward them to the given signal.
///
/// Returns once a shutdown signal has been received and propagated.
pub async fn listen_for_signals(shutdown: ShutdownSignal) -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating shutdown");
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, initiating shutdown");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, initiating shutdown");
    }

    shutdown.stop();
    Ok(())
}
