//! CLI and TCP client for courier.
//!
//! This crate provides the `courier` command-line interface, which both runs
//! the server and talks to it.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod socket;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use socket::SocketClient;
