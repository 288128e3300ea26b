//! Command-line interface definition.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use courier_core::{LogFormat, MessageId};

use crate::config::{ClientConfig, ServerSettings};

/// courier - a small TCP messaging service
#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "COURIER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Server host
    #[arg(long, env = "COURIER_HOST", global = true)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "COURIER_PORT", global = true)]
    pub port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Log line format: compact, pretty or json
    #[arg(long, env = "COURIER_LOG_FORMAT", global = true, default_value_t)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Connection settings: config file values overridden by flags.
    pub fn server_settings(&self, config: &ClientConfig) -> ServerSettings {
        let defaults = &config.server;
        ServerSettings {
            host: self.host.clone().unwrap_or_else(|| defaults.host.clone()),
            port: self.port.unwrap_or(defaults.port),
            timeout: self.timeout.unwrap_or(defaults.timeout),
        }
    }

    pub fn timeout(&self, config: &ClientConfig) -> Duration {
        Duration::from_secs(self.server_settings(config).timeout)
    }

    /// Whether debug output is enabled by flag or config.
    pub fn debug_enabled(&self, config: &ClientConfig) -> bool {
        self.debug || config.debug
    }
}

/// Account credentials, for commands that act as a user.
#[derive(Debug, Clone, Args)]
pub struct Credentials {
    /// Username
    #[arg(long, short, env = "COURIER_USER")]
    pub user: String,

    /// Password
    #[arg(long, env = "COURIER_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the server in the foreground
    Server {
        /// Server configuration file (TOML with host, port, debug)
        #[arg(long)]
        server_config: Option<PathBuf>,
    },

    /// Send text to the server and print the echo
    Echo {
        /// Text to echo
        text: String,
    },

    /// Create an account
    Register {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// List the messages in your inbox
    Messages {
        #[command(flatten)]
        credentials: Credentials,

        /// Only show unread messages
        #[arg(long)]
        unread: bool,
    },

    /// List users matching a wildcard pattern
    Users {
        #[command(flatten)]
        credentials: Credentials,

        /// Shell-style pattern (`*`, `?`, `[seq]`)
        #[arg(default_value = "*")]
        pattern: String,
    },

    /// Send a message
    Send {
        #[command(flatten)]
        credentials: Credentials,

        /// Recipient username
        to: String,

        /// Message body
        body: String,
    },

    /// Mark messages as read
    Read {
        #[command(flatten)]
        credentials: Credentials,

        /// Message ids
        #[arg(required = true)]
        ids: Vec<MessageId>,
    },

    /// Delete messages from your inbox
    Delete {
        #[command(flatten)]
        credentials: Credentials,

        /// Message ids
        #[arg(required = true)]
        ids: Vec<MessageId>,
    },

    /// Delete your account and every message in your inbox
    DeleteAccount {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}
