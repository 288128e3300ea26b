//! Connection multiplexer, dispatcher and in-memory tables for courier.
//!
//! This crate provides the courier server, which handles:
//! - TCP connections, each driven by a readiness loop of non-blocking
//!   reads and writes
//! - Frame reassembly across partial reads and queued partial writes
//! - Dispatch of decoded requests against the shared user/message tables
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_server::{ServerConfig, SignalHandler, SocketServer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = SocketServer::bind(ServerConfig::default()).await?;
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     server.run_until_shutdown(signals.shutdown().wait()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod signals;
mod socket;

pub use config::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
pub use connection::Connection;
pub use error::{DomainError, ServerError, ServerResult};
pub use handler::{RequestHandler, ServerState, Session, SharedState, new_shared_state};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use socket::SocketServer;
