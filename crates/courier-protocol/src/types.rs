//! Request and response types for the courier protocol.
//!
//! Every operation has a payload struct implementing [`WireFormat`]; the
//! [`Request`] and [`Response`] sum types tie each one to its kind byte.

use courier_core::{Message, MessageId};

use crate::codec::{
    DataKind, PayloadReader, PayloadWriter, RequestKind, ResponseKind, WireFormat,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::framing::{Frame, encode_frame};

/// Message element layout: sender, receiver, body, id, timestamp, read.
impl WireFormat for Message {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.sender);
        writer.put_str(&self.receiver);
        writer.put_str(&self.body);
        writer.put_id(&self.id);
        writer.put_f64(self.timestamp);
        writer.put_bool(self.read);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Message {
            sender: reader.get_str()?,
            receiver: reader.get_str()?,
            body: reader.get_str()?,
            id: reader.get_id()?,
            timestamp: reader.get_f64()?,
            read: reader.get_bool("message.read")?,
        })
    }
}

/// What an authenticate request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AuthAction {
    CreateAccount = 0,
    Login = 1,
}

impl TryFrom<u8> for AuthAction {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::CreateAccount),
            1 => Ok(Self::Login),
            value => Err(ProtocolError::InvalidValue {
                field: "auth.action",
                value,
            }),
        }
    }
}

/// Create an account or log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub action: AuthAction,
    pub username: String,
    pub password: String,
}

impl WireFormat for AuthRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_u8(self.action as u8);
        writer.put_str(&self.username);
        writer.put_str(&self.password);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            action: AuthAction::try_from(reader.get_u8()?)?,
            username: reader.get_str()?,
            password: reader.get_str()?,
        })
    }
}

/// Fetch every message in a user's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMessagesRequest {
    pub username: String,
}

impl WireFormat for GetMessagesRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.username);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            username: reader.get_str()?,
        })
    }
}

/// The messages of an inbox, each behind its own element header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetMessagesResponse {
    pub messages: Vec<Message>,
}

impl WireFormat for GetMessagesResponse {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_elements(DataKind::Message, &self.messages);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            messages: reader.get_elements(DataKind::Message)?,
        })
    }
}

/// List usernames matching a wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUsersRequest {
    pub username: String,
    pub pattern: String,
}

impl WireFormat for ListUsersRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.username);
        writer.put_str(&self.pattern);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            username: reader.get_str()?,
            pattern: reader.get_str()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUsersResponse {
    pub usernames: Vec<String>,
}

impl WireFormat for ListUsersResponse {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_list(&self.usernames);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            usernames: reader.get_list()?,
        })
    }
}

/// Deliver a message; `username` is the acting user and must be the sender.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessageRequest {
    pub username: String,
    pub message: Message,
}

impl WireFormat for SendMessageRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.username);
        self.message.encode(writer);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            username: reader.get_str()?,
            message: Message::decode(reader)?,
        })
    }
}

/// Mark messages in the user's inbox as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMessagesRequest {
    pub username: String,
    pub message_ids: Vec<MessageId>,
}

impl WireFormat for ReadMessagesRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.username);
        writer.put_list(&self.message_ids);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            username: reader.get_str()?,
            message_ids: reader.get_list()?,
        })
    }
}

/// Erase messages from the user's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMessagesRequest {
    pub username: String,
    pub message_ids: Vec<MessageId>,
}

impl WireFormat for DeleteMessagesRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.username);
        writer.put_list(&self.message_ids);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            username: reader.get_str()?,
            message_ids: reader.get_list()?,
        })
    }
}

/// Erase an account and everything in its inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteUserRequest {
    pub username: String,
}

impl WireFormat for DeleteUserRequest {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.username);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            username: reader.get_str()?,
        })
    }
}

/// A rejected request, with a message meant for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl WireFormat for ErrorResponse {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(&self.message);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            message: reader.get_str()?,
        })
    }
}

/// Request types that can be sent from client to server.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Raw UTF-8 text, echoed back verbatim.
    Echo(String),
    Authenticate(AuthRequest),
    GetMessages(GetMessagesRequest),
    ListUsers(ListUsersRequest),
    SendMessage(SendMessageRequest),
    ReadMessages(ReadMessagesRequest),
    DeleteMessages(DeleteMessagesRequest),
    DeleteUser(DeleteUserRequest),
}

impl Request {
    pub fn echo(text: impl Into<String>) -> Self {
        Self::Echo(text.into())
    }

    pub fn create_account(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Authenticate(AuthRequest {
            action: AuthAction::CreateAccount,
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Authenticate(AuthRequest {
            action: AuthAction::Login,
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn get_messages(username: impl Into<String>) -> Self {
        Self::GetMessages(GetMessagesRequest {
            username: username.into(),
        })
    }

    pub fn list_users(username: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ListUsers(ListUsersRequest {
            username: username.into(),
            pattern: pattern.into(),
        })
    }

    pub fn send_message(username: impl Into<String>, message: Message) -> Self {
        Self::SendMessage(SendMessageRequest {
            username: username.into(),
            message,
        })
    }

    pub fn read_messages(username: impl Into<String>, message_ids: Vec<MessageId>) -> Self {
        Self::ReadMessages(ReadMessagesRequest {
            username: username.into(),
            message_ids,
        })
    }

    pub fn delete_messages(username: impl Into<String>, message_ids: Vec<MessageId>) -> Self {
        Self::DeleteMessages(DeleteMessagesRequest {
            username: username.into(),
            message_ids,
        })
    }

    pub fn delete_user(username: impl Into<String>) -> Self {
        Self::DeleteUser(DeleteUserRequest {
            username: username.into(),
        })
    }

    /// The kind byte this request is framed with.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Echo(_) => RequestKind::Echo,
            Self::Authenticate(_) => RequestKind::Authenticate,
            Self::GetMessages(_) => RequestKind::GetMessages,
            Self::ListUsers(_) => RequestKind::ListUsers,
            Self::SendMessage(_) => RequestKind::SendMessage,
            Self::ReadMessages(_) => RequestKind::ReadMessages,
            Self::DeleteMessages(_) => RequestKind::DeleteMessages,
            Self::DeleteUser(_) => RequestKind::DeleteUser,
        }
    }

    /// Encodes the payload, without the frame header.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Self::Echo(text) => text.as_bytes().to_vec(),
            Self::Authenticate(req) => req.to_payload(),
            Self::GetMessages(req) => req.to_payload(),
            Self::ListUsers(req) => req.to_payload(),
            Self::SendMessage(req) => req.to_payload(),
            Self::ReadMessages(req) => req.to_payload(),
            Self::DeleteMessages(req) => req.to_payload(),
            Self::DeleteUser(req) => req.to_payload(),
        }
    }

    /// Encodes the complete frame: header followed by payload.
    pub fn to_frame(&self) -> ProtocolResult<Vec<u8>> {
        encode_frame(self.kind(), &self.encode_payload())
    }

    /// Decodes a request from its kind byte and exactly its payload bytes.
    pub fn decode(kind: u8, payload: &[u8]) -> ProtocolResult<Self> {
        Ok(match RequestKind::try_from(kind)? {
            RequestKind::Echo => Self::Echo(std::str::from_utf8(payload)?.to_owned()),
            RequestKind::Authenticate => Self::Authenticate(AuthRequest::from_payload(payload)?),
            RequestKind::GetMessages => {
                Self::GetMessages(GetMessagesRequest::from_payload(payload)?)
            }
            RequestKind::ListUsers => Self::ListUsers(ListUsersRequest::from_payload(payload)?),
            RequestKind::SendMessage => {
                Self::SendMessage(SendMessageRequest::from_payload(payload)?)
            }
            RequestKind::ReadMessages => {
                Self::ReadMessages(ReadMessagesRequest::from_payload(payload)?)
            }
            RequestKind::DeleteMessages => {
                Self::DeleteMessages(DeleteMessagesRequest::from_payload(payload)?)
            }
            RequestKind::DeleteUser => Self::DeleteUser(DeleteUserRequest::from_payload(payload)?),
        })
    }

    pub fn from_frame(frame: &Frame) -> ProtocolResult<Self> {
        Self::decode(frame.header.kind, &frame.payload)
    }

    /// The acting username, if the request carries one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Echo(_) => None,
            Self::Authenticate(req) => Some(&req.username),
            Self::GetMessages(req) => Some(&req.username),
            Self::ListUsers(req) => Some(&req.username),
            Self::SendMessage(req) => Some(&req.username),
            Self::ReadMessages(req) => Some(&req.username),
            Self::DeleteMessages(req) => Some(&req.username),
            Self::DeleteUser(req) => Some(&req.username),
        }
    }
}

/// Response types that can be sent from server to client.
///
/// Acknowledgements carry no payload: their frame is a bare header.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Echo(String),
    Authenticate,
    GetMessages(GetMessagesResponse),
    ListUsers(ListUsersResponse),
    SendMessage,
    ReadMessages,
    DeleteMessages,
    DeleteUser,
    Error(ErrorResponse),
}

impl Response {
    pub fn echo(text: impl Into<String>) -> Self {
        Self::Echo(text.into())
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self::GetMessages(GetMessagesResponse { messages })
    }

    pub fn usernames(usernames: Vec<String>) -> Self {
        Self::ListUsers(ListUsersResponse { usernames })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse::new(message))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Echo(_) => ResponseKind::Echo,
            Self::Authenticate => ResponseKind::Authenticate,
            Self::GetMessages(_) => ResponseKind::GetMessages,
            Self::ListUsers(_) => ResponseKind::ListUsers,
            Self::SendMessage => ResponseKind::SendMessage,
            Self::ReadMessages => ResponseKind::ReadMessages,
            Self::DeleteMessages => ResponseKind::DeleteMessages,
            Self::DeleteUser => ResponseKind::DeleteUser,
            Self::Error(_) => ResponseKind::Error,
        }
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Self::Echo(text) => text.as_bytes().to_vec(),
            Self::GetMessages(resp) => resp.to_payload(),
            Self::ListUsers(resp) => resp.to_payload(),
            Self::Error(resp) => resp.to_payload(),
            Self::Authenticate
            | Self::SendMessage
            | Self::ReadMessages
            | Self::DeleteMessages
            | Self::DeleteUser => Vec::new(),
        }
    }

    pub fn to_frame(&self) -> ProtocolResult<Vec<u8>> {
        encode_frame(self.kind(), &self.encode_payload())
    }

    /// Decodes a response from its kind byte and exactly its payload bytes.
    pub fn decode(kind: u8, payload: &[u8]) -> ProtocolResult<Self> {
        let ack = |response: Response| {
            if payload.is_empty() {
                Ok(response)
            } else {
                Err(ProtocolError::TrailingBytes {
                    remaining: payload.len(),
                })
            }
        };

        match ResponseKind::try_from(kind)? {
            ResponseKind::Echo => Ok(Self::Echo(std::str::from_utf8(payload)?.to_owned())),
            ResponseKind::Authenticate => ack(Self::Authenticate),
            ResponseKind::GetMessages => Ok(Self::GetMessages(
                GetMessagesResponse::from_payload(payload)?,
            )),
            ResponseKind::ListUsers => {
                Ok(Self::ListUsers(ListUsersResponse::from_payload(payload)?))
            }
            ResponseKind::SendMessage => ack(Self::SendMessage),
            ResponseKind::ReadMessages => ack(Self::ReadMessages),
            ResponseKind::DeleteMessages => ack(Self::DeleteMessages),
            ResponseKind::DeleteUser => ack(Self::DeleteUser),
            ResponseKind::Error => Ok(Self::Error(ErrorResponse::from_payload(payload)?)),
        }
    }

    pub fn from_frame(frame: &Frame) -> ProtocolResult<Self> {
        Self::decode(frame.header.kind, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{HEADER_SIZE, Header};

    fn sample_message(body: &str) -> Message {
        Message::new("user1", "user2", body)
            .with_id(MessageId::from_u128(0))
            .with_timestamp(0.0)
    }

    fn roundtrip_request(request: Request) {
        let frame = request.to_frame().unwrap();
        let header = Header::decode(&frame).unwrap();
        assert_eq!(header.kind, u8::from(request.kind()));
        assert_eq!(header.frame_len(), frame.len());

        let decoded = Request::decode(header.kind, &frame[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, request);
    }

    fn roundtrip_response(response: Response) {
        let frame = response.to_frame().unwrap();
        let header = Header::decode(&frame).unwrap();
        assert_eq!(header.kind, u8::from(response.kind()));

        let decoded = Response::decode(header.kind, &frame[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn requests_roundtrip() {
        let ids = vec![MessageId::from_u128(1), MessageId::from_u128(2)];
        for request in [
            Request::echo("hello world"),
            Request::echo(""),
            Request::create_account("user1", "password"),
            Request::login("user1", ""),
            Request::get_messages("user2"),
            Request::list_users("user1", "user*"),
            Request::send_message("user1", sample_message("hello user2!")),
            Request::send_message("user1", sample_message("")),
            Request::read_messages("user2", ids.clone()),
            Request::read_messages("user2", Vec::new()),
            Request::delete_messages("user2", ids),
            Request::delete_user("user2"),
        ] {
            roundtrip_request(request);
        }
    }

    #[test]
    fn responses_roundtrip() {
        let mut read = sample_message("seen");
        read.mark_read();
        for response in [
            Response::echo("hello world"),
            Response::Authenticate,
            Response::messages(vec![sample_message("a"), read]),
            Response::messages(Vec::new()),
            Response::usernames(vec!["user1".into(), "user2".into()]),
            Response::usernames(Vec::new()),
            Response::SendMessage,
            Response::ReadMessages,
            Response::DeleteMessages,
            Response::DeleteUser,
            Response::error("Login failed: incorrect password."),
        ] {
            roundtrip_response(response);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let request = Request::send_message("user1", sample_message("hi"));
        assert_eq!(request.to_frame().unwrap(), request.to_frame().unwrap());
        let response = Response::messages(vec![sample_message("hi")]);
        assert_eq!(response.to_frame().unwrap(), response.to_frame().unwrap());
    }

    #[test]
    fn acks_are_bare_headers() {
        for response in [
            Response::Authenticate,
            Response::SendMessage,
            Response::ReadMessages,
            Response::DeleteMessages,
            Response::DeleteUser,
        ] {
            let frame = response.to_frame().unwrap();
            assert_eq!(frame.len(), HEADER_SIZE);
            assert_eq!(&frame[1..], &[0, 0, 0, 0]);
        }
    }

    #[test]
    fn ack_with_payload_rejected() {
        let result = Response::decode(ResponseKind::DeleteUser.into(), &[0]);
        assert!(matches!(result, Err(ProtocolError::TrailingBytes { remaining: 1 })));
    }

    #[test]
    fn message_equality_covers_every_field() {
        let a = sample_message("hello world");
        let b = sample_message("hello world!");
        assert_ne!(a, b);
        let decoded = Message::from_payload(&a.to_payload()).unwrap();
        assert_eq!(decoded, a);
    }

    #[test]
    fn unknown_auth_action() {
        let mut payload = Request::login("u", "p").encode_payload();
        payload[0] = 2;
        let result = Request::decode(RequestKind::Authenticate.into(), &payload);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidValue { field: "auth.action", value: 2 })
        ));
    }

    #[test]
    fn unknown_request_kind() {
        assert!(matches!(
            Request::decode(8, &[]),
            Err(ProtocolError::UnknownKind { context: "request", kind: 8 })
        ));
        assert!(matches!(
            Response::decode(42, &[]),
            Err(ProtocolError::UnknownKind { context: "response", kind: 42 })
        ));
    }

    #[test]
    fn every_truncation_fails_cleanly() {
        let requests = [
            Request::create_account("user1", "password"),
            Request::list_users("user1", "u?er*"),
            Request::send_message("user1", sample_message("hello")),
            Request::read_messages("user2", vec![MessageId::from_u128(9)]),
            Request::delete_user("user2"),
        ];
        for request in requests {
            let payload = request.encode_payload();
            for cut in 0..payload.len() {
                let result = Request::decode(request.kind().into(), &payload[..cut]);
                assert!(
                    matches!(result, Err(ProtocolError::TruncatedPayload { .. })),
                    "{:?} cut at {} gave {:?}",
                    request.kind(),
                    cut,
                    result
                );
            }
        }

        let response = Response::messages(vec![sample_message("a"), sample_message("b")]);
        let payload = response.encode_payload();
        for cut in 0..payload.len() {
            let result = Response::decode(response.kind().into(), &payload[..cut]);
            assert!(matches!(result, Err(ProtocolError::TruncatedPayload { .. })));
        }
    }

    #[test]
    fn request_username() {
        assert_eq!(Request::echo("x").username(), None);
        assert_eq!(Request::delete_user("bob").username(), Some("bob"));
    }

    #[test]
    fn auth_request_golden_bytes() {
        let frame = Request::create_account("ab", "pw").to_frame().unwrap();
        let hex: String = frame.iter().map(|b| format!("{b:02x}")).collect();
        insta::assert_snapshot!(hex, @"010000000d00000000026162000000027077");
    }

    #[test]
    fn message_list_golden_bytes() {
        let response = Response::messages(vec![
            Message::new("a", "b", "hi")
                .with_id(MessageId::from_u128(1))
                .with_timestamp(1.5),
        ]);
        let hex: String = response
            .to_frame()
            .unwrap()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        insta::assert_snapshot!(hex, @"020000003200000001010000002900000001610000000162000000026869000000000000000000000000000000013ff800000000000000");
    }
}
