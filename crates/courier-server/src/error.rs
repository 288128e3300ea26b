//! Server error types.

use std::io;

use courier_core::MessageId;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that end a connection or stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (socket, config file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (framing, encoding, etc.).
    #[error("Protocol error: {0}")]
    Protocol(#[from] courier_protocol::ProtocolError),

    /// Could not bind the listening socket.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }
}

/// A rejected request. These are answered with an `Error` response and leave
/// the connection open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Create account failed: user \"{0}\" already exists.")]
    UserExists(String),

    #[error("Login failed: user \"{0}\" does not exist.")]
    UserNotFound(String),

    #[error("Login failed: incorrect password.")]
    WrongPassword,

    #[error("Send message failed: recipient \"{0}\" does not exist.")]
    RecipientNotFound(String),

    #[error("Login required.")]
    LoginRequired,

    #[error("Not logged in as \"{0}\".")]
    NotLoggedInAs(String),

    #[error("User \"{0}\" does not exist.")]
    UnknownUser(String),

    #[error("Send message failed: sender \"{sender}\" does not match user \"{username}\".")]
    SenderMismatch { sender: String, username: String },

    #[error("Send message failed: message {0} already exists.")]
    DuplicateMessage(MessageId),

    #[error("Message {0} does not exist.")]
    UnknownMessage(MessageId),

    #[error("Message {id} is not addressed to \"{username}\".")]
    NotRecipient { id: MessageId, username: String },
}
