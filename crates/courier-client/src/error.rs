//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Connection to server failed.
    Connection(String),
    /// Protocol/framing error.
    Protocol(String),
    /// Request timed out.
    Timeout(String),
    /// The server answered with an error response.
    Rejected(String),
    /// The server could not be started.
    Server(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::Rejected(msg) => write!(f, "{}", msg),
            Self::Server(msg) => write!(f, "server error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<courier_protocol::ProtocolError> for ClientError {
    fn from(err: courier_protocol::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<courier_server::ServerError> for ClientError {
    fn from(err: courier_server::ServerError) -> Self {
        Self::Server(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_shows_server_message() {
        let err = ClientError::Rejected("Login failed: incorrect password.".into());
        assert_eq!(err.to_string(), "Login failed: incorrect password.");
    }

    #[test]
    fn protocol_error_converts() {
        let err: ClientError = courier_protocol::ProtocolError::TrailingBytes { remaining: 3 }.into();
        assert!(matches!(err, ClientError::Protocol(_)));
        assert!(err.to_string().starts_with("protocol error:"));
    }
}
