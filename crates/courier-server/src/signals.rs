//! Shutdown signal handling for the server.
//!
//! SIGTERM and SIGINT (Ctrl-C on non-Unix platforms) trigger a graceful
//! shutdown. Tests trigger the same path through a [`ShutdownHandle`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Signal handler that turns process signals into a shutdown notification.
pub struct SignalHandler {
    /// Channel to signal shutdown.
    shutdown_tx: Arc<watch::Sender<bool>>,
    /// Channel to receive shutdown signal.
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a new signal handler.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawns the signal listener task.
    ///
    /// This should be called once at server startup to start listening for signals.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(error = %e, "Failed to install signal handlers");
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
            }
            let _ = shutdown_tx.send(true);

            debug!("Signal listener stopped");
        });
    }

    /// Non-Unix implementation: Ctrl-C only.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, initiating shutdown");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    /// Returns a future that completes when a shutdown signal is received.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Returns true if shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Creates a shutdown handle that can be passed to other components.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
            rx: self.shutdown_rx.clone(),
        }
    }
}

/// A signal that completes when shutdown is signaled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn wait(mut self) {
        // A closed channel can never fire, so it counts as shutdown too.
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// A handle for triggering or checking shutdown status.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// Triggers a shutdown.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns a future that completes when shutdown is triggered.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{ServerConfig, SocketServer};

    async fn bind() -> SocketServer {
        SocketServer::bind(ServerConfig::new("127.0.0.1", 0))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn trigger_stops_a_running_server() {
        let signals = SignalHandler::new();
        let handle = signals.shutdown_handle();
        let server = bind().await;

        let stopping = async {
            tokio::task::yield_now().await;
            assert!(!handle.is_shutdown());
            handle.trigger();
        };
        let serving = server.run_until_shutdown(signals.shutdown().wait());
        let (result, ()) = tokio::time::timeout(Duration::from_secs(1), async {
            tokio::join!(serving, stopping)
        })
        .await
        .expect("server should stop on shutdown");

        assert!(result.is_ok());
        assert!(signals.is_shutdown());
    }

    #[tokio::test]
    async fn server_started_after_shutdown_returns_at_once() {
        let signals = SignalHandler::new();
        signals.trigger_shutdown();

        let server = bind().await;
        tokio::time::timeout(
            Duration::from_secs(1),
            server.run_until_shutdown(signals.shutdown().wait()),
        )
        .await
        .expect("shutdown already requested")
        .unwrap();
    }

    #[tokio::test]
    async fn dropped_handler_releases_waiters() {
        let signals = SignalHandler::new();
        let pending = signals.shutdown();
        drop(signals);

        tokio::time::timeout(Duration::from_secs(1), pending.wait())
            .await
            .expect("closed channel counts as shutdown");
    }
}
