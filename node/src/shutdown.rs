//! Graceful shutdown: SIGINT/SIGTERM fan out to the server and every poller
//! through a `tokio::sync::broadcast` channel.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Owns the sending half; the node hands a receiver to the RPC server and to
/// each poller it spawns.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for one task. Only receivers taken before [`Self::shutdown`]
    /// see the signal, so subscribe before spawning.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every subscribed task to stop. With no subscribers left this is
    /// a no-op.
    pub fn shutdown(&self) {
        if self.tx.send(()).is_err() {
            debug!("shutdown requested with no running tasks");
        }
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => info!("received SIGINT, shutting down"),
            _ = terminate => info!("received SIGTERM, shutting down"),
        }
        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_shutdown() {
        let controller = ShutdownController::new();
        let mut server = controller.subscribe();
        let mut poller = controller.subscribe();
        controller.shutdown();
        assert!(server.recv().await.is_ok());
        assert!(poller.recv().await.is_ok());
    }

    #[tokio::test]
    async fn late_subscriber_misses_an_earlier_shutdown() {
        let controller = ShutdownController::new();
        controller.shutdown();
        let mut late = controller.subscribe();
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
