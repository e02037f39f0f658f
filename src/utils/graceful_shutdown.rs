//! Shutdown coordination.
//!
//! One `GracefulShutdown` is shared between the signal handler, the HTTP
//! server and anything else that has to stop. The first trigger wins; later
//! triggers are ignored. Waiters that subscribe after the trigger still see
//! it, since the reason lives in a `watch` channel.
use std::time::Duration;

use eyre::{Result, WrapErr};
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// Why the service is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Triggered programmatically
    Requested,
}

pub struct GracefulShutdown {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Start shutdown. Returns `false` if shutdown was already under way.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) -> bool {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });

        if first {
            tracing::info!(?reason, "Shutdown initiated");
        } else {
            tracing::warn!(?reason, "Shutdown already initiated, ignoring signal");
        }
        first
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Requested),
            // the sender lives in `self`, so the channel cannot close while we wait
            Err(_) => ShutdownReason::Requested,
        }
    }

    /// Listen for SIGINT and SIGTERM and trigger shutdown on the first one.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started. Listening for SIGINT and SIGTERM");

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.wrap_err("Failed to listen for Ctrl+C")?;
                self.trigger_shutdown(ShutdownReason::Interrupt);
            }
            result = terminate_signal() => {
                result?;
                self.trigger_shutdown(ShutdownReason::Terminate);
            }
        }
        Ok(())
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn terminate_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("Failed to register SIGTERM handler")?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate_signal() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}

/// Wait for a queue consumer to finish after its senders were dropped.
///
/// Returns `Some(consumed)` when the consumer exits within `limit`, `None` on
/// timeout (the consumer is aborted) or if the consumer task failed.
pub async fn drain_consumer(consumer: JoinHandle<u64>, limit: Duration) -> Option<u64> {
    let abort = consumer.abort_handle();
    match timeout(limit, consumer).await {
        Ok(Ok(consumed)) => {
            tracing::info!(consumed, "Dispatch queue drained");
            Some(consumed)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Dispatch consumer failed");
            None
        }
        Err(_) => {
            abort.abort();
            tracing::warn!(?limit, "Drain timeout exceeded; abandoning queued envelopes");
            None
        }
    }
}
