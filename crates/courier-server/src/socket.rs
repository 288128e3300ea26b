//! TCP listener.
//!
//! This module accepts client connections and spawns one task per
//! connection. Run it on a current-thread runtime to keep every connection
//! and handler on a single OS thread.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::handler::{RequestHandler, SharedState, new_shared_state};

/// TCP server for handling client connections.
pub struct SocketServer {
    /// Server configuration.
    config: ServerConfig,
    /// TCP listener.
    listener: TcpListener,
    /// Handler shared by every connection.
    handler: RequestHandler,
}

impl SocketServer {
    /// Binds to the configured address with fresh, empty tables.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        Self::bind_with_state(config, new_shared_state()).await
    }

    /// Binds to the configured address, serving the given tables.
    pub async fn bind_with_state(config: ServerConfig, state: SharedState) -> ServerResult<Self> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::bind(&address, e))?;
        info!(address = %listener.local_addr()?, "Server listening");

        let handler = RequestHandler::new(state).with_debug(config.debug);
        Ok(Self {
            config,
            listener,
            handler,
        })
    }

    /// Returns the bound address, with the actual port when bound to port 0.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &SharedState {
        self.handler.state()
    }

    /// Accepts a single connection.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let (stream, peer) = self.listener.accept().await?;
        info!(peer = %peer, "Accepted client connection");
        Ok(Connection::new(stream, peer))
    }

    /// Runs the accept loop, spawning a task for each connection.
    ///
    /// This method runs indefinitely; accept errors are logged and skipped.
    pub async fn run(&self) -> ServerResult<()> {
        loop {
            match self.accept().await {
                Ok(connection) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        let peer = connection.peer();
                        match connection.serve(&handler).await {
                            Ok(()) => info!(peer = %peer, "Closed client connection"),
                            Err(e) => warn!(peer = %peer, error = %e, "Closed client connection"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Runs the accept loop until the shutdown future completes.
    pub async fn run_until_shutdown<S>(&self, shutdown: S) -> ServerResult<()>
    where
        S: std::future::Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                debug!(users = self.state().read().await.user_count(), "Final state");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_protocol::{Request, Response};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config() -> ServerConfig {
        ServerConfig::new("127.0.0.1", 0)
    }

    #[tokio::test]
    async fn bind_reports_actual_port() {
        let server = SocketServer::bind(test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn bind_rejects_port_in_use() {
        let first = SocketServer::bind(test_config()).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let result = SocketServer::bind(test_config().with_port(port)).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn connection_roundtrip() {
        let server = SocketServer::bind(test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            let frame = Request::echo("hello world").to_frame().unwrap();
            stream.write_all(&frame).await.unwrap();

            let mut header = [0u8; 5];
            stream.read_exact(&mut header).await.unwrap();
            let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).await.unwrap();

            let response = Response::decode(header[0], &payload).unwrap();
            assert_eq!(response, Response::echo("hello world"));
        });

        let connection = server.accept().await.unwrap();
        let handler = server.handler.clone();
        let serve = tokio::spawn(async move { connection.serve(&handler).await });

        client_task.await.unwrap();
        // Client dropped its stream, so the connection ends cleanly.
        serve.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn connection_closes_on_unknown_kind() {
        let server = SocketServer::bind(test_config()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream.write_all(&[42, 0, 0, 0, 0]).await.unwrap();
            // The server closes without answering.
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf).await;
            assert!(buf.is_empty());
        });

        let connection = server.accept().await.unwrap();
        let result = connection.serve(&server.handler).await;
        assert!(matches!(result, Err(ServerError::Protocol(_))));

        client_task.await.unwrap();
    }

    #[tokio::test]
    async fn run_until_shutdown_stops() {
        let server = SocketServer::bind(test_config()).await.unwrap();
        let result = server.run_until_shutdown(async {}).await;
        assert!(result.is_ok());
    }
}
