//! Graceful shutdown signalling for the serve loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    token: CancellationToken,
}

/// Cloneable trigger for the drain sequence.
///
/// Only the first `shutdown` call has an effect; later calls (from any
/// thread, concurrently or after the loop has exited) are no-ops.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns `true` if this call initiated it.
    pub fn shutdown(&self) -> bool {
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already requested");
            return false;
        }

        tracing::info!("Shutdown requested");
        self.inner.token.cancel();
        true
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&self) {
        self.inner.token.cancelled().await;
    }
}

/// Wait for SIGINT or SIGTERM, then trigger `handle`.
pub async fn shutdown_on_signal(handle: ShutdownHandle) {
    wait_for_signal().await;
    handle.shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            }
        }
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
    }
}
