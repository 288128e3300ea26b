//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while framing, encoding or decoding.
///
/// Every variant is fatal to the connection it occurs on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Fewer than five bytes were supplied for a header.
    #[error("malformed header: expected {expected} bytes, got {received}")]
    MalformedHeader { expected: usize, received: usize },

    /// A field ran past the end of the supplied bytes.
    #[error("truncated payload: needed {needed} bytes, {available} available")]
    TruncatedPayload { needed: usize, available: usize },

    /// Bytes were left over after a payload was fully decoded.
    #[error("trailing bytes: {remaining} unread bytes after payload")]
    TrailingBytes { remaining: usize },

    /// A header declared (or an encoder produced) a payload above the limit.
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: u32 },

    /// A kind byte that names no request, response or data element.
    #[error("unknown {context} kind: {kind}")]
    UnknownKind { context: &'static str, kind: u8 },

    /// An element header whose kind does not match what the list holds.
    #[error("unexpected element kind: expected {expected}, got {actual}")]
    UnexpectedElement { expected: u8, actual: u8 },

    /// A field holding a value outside its domain.
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u8 },

    /// A string field that is not valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        Self::TruncatedPayload { needed, available }
    }
}
