//! Wire framing and request/response types for courier.
//!
//! # Protocol Overview
//!
//! Every frame, in both directions, is a five-byte header followed by a
//! payload:
//! - 1 byte: kind (request kind, response kind or data kind)
//! - 4 bytes: payload size (u32, big-endian)
//! - N bytes: payload
//!
//! A client sends one request frame and reads back one response frame; a
//! rejected request is answered with an `Error` response whose payload is a
//! human-readable message.
//!
//! # Example
//!
//! ```rust
//! use courier_protocol::{Request, Response};
//!
//! let bytes = Request::login("user1", "password").to_frame().unwrap();
//! let decoded = Request::decode(bytes[0], &bytes[5..]).unwrap();
//! assert_eq!(decoded, Request::login("user1", "password"));
//!
//! let reply = Response::error("Login failed: incorrect password.");
//! assert!(reply.is_error());
//! ```

mod codec;
mod error;
mod framing;
mod types;

pub use codec::{
    DataKind, HEADER_SIZE, Header, PayloadReader, PayloadWriter, RequestKind, ResponseKind,
    WireFormat,
};
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{Frame, FrameDecoder, FrameReader, FrameWriter, encode_frame};
pub use types::{
    AuthAction, AuthRequest, DeleteMessagesRequest, DeleteUserRequest, ErrorResponse,
    GetMessagesRequest, GetMessagesResponse, ListUsersRequest, ListUsersResponse,
    ReadMessagesRequest, Request, Response, SendMessageRequest,
};

/// Largest payload a single frame may carry (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
