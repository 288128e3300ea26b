//! Frame header, kind bytes and payload field encoding.
//!
//! All integers are big-endian:
//!
//! ```text
//! Header      := kind:u8 payload_size:u32          (5 bytes)
//! String      := len:u32 bytes:len                 (UTF-8)
//! Identifier  := bytes:16
//! List<T>     := count:u32 element:T*
//! Element     := Header(kind = data kind) bytes    (for variable-sized T)
//! ```
//!
//! [`PayloadReader`] never trusts a declared length beyond the bytes it was
//! given: running out of input is a [`ProtocolError::TruncatedPayload`].

use courier_core::MessageId;

use crate::error::{ProtocolError, ProtocolResult};

/// Size of an encoded [`Header`].
pub const HEADER_SIZE: usize = 5;

/// The fixed-size prefix of every frame and of every list element.
///
/// `kind` is interpreted from context: a [`RequestKind`] on frames sent by a
/// client, a [`ResponseKind`] on frames sent by the server and a [`DataKind`]
/// on list elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub kind: u8,
    pub payload_size: u32,
}

impl Header {
    pub fn new(kind: impl Into<u8>, payload_size: u32) -> Self {
        Self {
            kind: kind.into(),
            payload_size,
        }
    }

    /// Encodes the header to its 5-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.kind;
        bytes[1..].copy_from_slice(&self.payload_size.to_be_bytes());
        bytes
    }

    /// Decodes a header from the first five bytes of `data`.
    pub fn decode(data: &[u8]) -> ProtocolResult<Self> {
        let Some(bytes) = data.get(..HEADER_SIZE) else {
            return Err(ProtocolError::MalformedHeader {
                expected: HEADER_SIZE,
                received: data.len(),
            });
        };
        Ok(Self {
            kind: bytes[0],
            payload_size: u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
        })
    }

    /// Total size of the frame this header introduces.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_size as usize
    }
}

/// Kinds carried by request frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    Echo = 0,
    Authenticate = 1,
    GetMessages = 2,
    ListUsers = 3,
    SendMessage = 4,
    ReadMessages = 5,
    DeleteMessages = 6,
    DeleteUser = 7,
}

impl TryFrom<u8> for RequestKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Echo,
            1 => Self::Authenticate,
            2 => Self::GetMessages,
            3 => Self::ListUsers,
            4 => Self::SendMessage,
            5 => Self::ReadMessages,
            6 => Self::DeleteMessages,
            7 => Self::DeleteUser,
            kind => {
                return Err(ProtocolError::UnknownKind {
                    context: "request",
                    kind,
                });
            }
        })
    }
}

impl From<RequestKind> for u8 {
    fn from(kind: RequestKind) -> Self {
        kind as u8
    }
}

/// Kinds carried by response frames. Same numbering as requests, plus `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseKind {
    Echo = 0,
    Authenticate = 1,
    GetMessages = 2,
    ListUsers = 3,
    SendMessage = 4,
    ReadMessages = 5,
    DeleteMessages = 6,
    DeleteUser = 7,
    Error = 8,
}

impl TryFrom<u8> for ResponseKind {
    type Error = ProtocolError;

    // `Self::Error` would be ambiguous with the variant, so the enum is named.
    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        Ok(match value {
            0 => ResponseKind::Echo,
            1 => ResponseKind::Authenticate,
            2 => ResponseKind::GetMessages,
            3 => ResponseKind::ListUsers,
            4 => ResponseKind::SendMessage,
            5 => ResponseKind::ReadMessages,
            6 => ResponseKind::DeleteMessages,
            7 => ResponseKind::DeleteUser,
            8 => ResponseKind::Error,
            kind => {
                return Err(ProtocolError::UnknownKind {
                    context: "response",
                    kind,
                });
            }
        })
    }
}

impl From<ResponseKind> for u8 {
    fn from(kind: ResponseKind) -> Self {
        kind as u8
    }
}

/// Kinds carried by list element headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataKind {
    Null = 0,
    Message = 1,
    List = 2,
}

impl TryFrom<u8> for DataKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Null,
            1 => Self::Message,
            2 => Self::List,
            kind => {
                return Err(ProtocolError::UnknownKind {
                    context: "data",
                    kind,
                });
            }
        })
    }
}

impl From<DataKind> for u8 {
    fn from(kind: DataKind) -> Self {
        kind as u8
    }
}

/// A value with a binary payload encoding.
///
/// `decode` consumes exactly the bytes `encode` produced, so values can be
/// laid out back to back inside one payload.
pub trait WireFormat: Sized {
    fn encode(&self, writer: &mut PayloadWriter);

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self>;

    /// Encodes the value as a standalone payload.
    fn to_payload(&self) -> Vec<u8> {
        let mut writer = PayloadWriter::new();
        self.encode(&mut writer);
        writer.into_bytes()
    }

    /// Decodes a standalone payload, rejecting leftover bytes.
    fn from_payload(payload: &[u8]) -> ProtocolResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let value = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

/// Strings are length-prefixed UTF-8.
impl WireFormat for String {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_str(self);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        reader.get_str()
    }
}

/// Identifiers are 16 raw bytes, no prefix.
impl WireFormat for MessageId {
    fn encode(&self, writer: &mut PayloadWriter) {
        writer.put_id(self);
    }

    fn decode(reader: &mut PayloadReader<'_>) -> ProtocolResult<Self> {
        reader.get_id()
    }
}

/// Builds a payload field by field.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Appends bytes with no length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_str(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.put_raw(value.as_bytes());
    }

    pub fn put_id(&mut self, id: &MessageId) {
        self.put_raw(id.as_bytes());
    }

    /// Appends `count` followed by each item encoded back to back.
    pub fn put_list<T: WireFormat>(&mut self, items: &[T]) {
        self.put_u32(items.len() as u32);
        for item in items {
            item.encode(self);
        }
    }

    /// Appends `count` followed by each item behind its own element header,
    /// so a reader can skip an element without parsing it.
    pub fn put_elements<T: WireFormat>(&mut self, kind: DataKind, items: &[T]) {
        self.put_u32(items.len() as u32);
        for item in items {
            let body = item.to_payload();
            self.put_raw(&Header::new(kind, body.len() as u32).encode());
            self.put_raw(&body);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over a payload.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consumes the next `len` bytes.
    pub fn take(&mut self, len: usize) -> ProtocolResult<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(ProtocolError::truncated(len, available));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Consumes everything that is left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    pub fn get_u8(&mut self) -> ProtocolResult<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn get_u32(&mut self) -> ProtocolResult<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn get_f64(&mut self) -> ProtocolResult<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Reads a bool byte; anything other than 0 or 1 is rejected.
    pub fn get_bool(&mut self, field: &'static str) -> ProtocolResult<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(ProtocolError::InvalidValue { field, value }),
        }
    }

    pub fn get_str(&mut self) -> ProtocolResult<String> {
        let len = self.get_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }

    pub fn get_id(&mut self) -> ProtocolResult<MessageId> {
        Ok(MessageId::from_bytes(self.take_array()?))
    }

    pub fn get_header(&mut self) -> ProtocolResult<Header> {
        Header::decode(self.take(HEADER_SIZE)?)
    }

    /// Reads a count-prefixed list of items laid out back to back.
    pub fn get_list<T: WireFormat>(&mut self) -> ProtocolResult<Vec<T>> {
        let count = self.get_u32()? as usize;
        // The count is untrusted; every item takes at least one byte.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    /// Reads a count-prefixed list of header-wrapped elements of `kind`.
    ///
    /// Each element must consume exactly the size its header declares.
    pub fn get_elements<T: WireFormat>(&mut self, kind: DataKind) -> ProtocolResult<Vec<T>> {
        let count = self.get_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(self.remaining() / HEADER_SIZE));
        for _ in 0..count {
            let header = self.get_header()?;
            if header.kind != u8::from(kind) {
                return Err(ProtocolError::UnexpectedElement {
                    expected: kind.into(),
                    actual: header.kind,
                });
            }
            let body = self.take(header.payload_size as usize)?;
            items.push(T::from_payload(body)?);
        }
        Ok(items)
    }

    /// Ensures the whole payload was consumed.
    pub fn finish(self) -> ProtocolResult<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(ProtocolError::TrailingBytes { remaining }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = Header::new(RequestKind::ListUsers, 0x0102_0304);
        assert_eq!(header.encode(), [3, 1, 2, 3, 4]);
        assert_eq!(Header::decode(&header.encode()).unwrap(), header);
        assert_eq!(header.frame_len(), 5 + 0x0102_0304);
    }

    #[test]
    fn header_equality() {
        let a = Header::new(RequestKind::Echo, 2620);
        let b = Header::new(RequestKind::Echo, 2621);
        assert_ne!(a, b);
        assert_eq!(Header::decode(&b.encode()).unwrap(), b);
    }

    #[test]
    fn header_decode_ignores_following_bytes() {
        let header = Header::decode(&[8, 0, 0, 0, 2, 0xaa, 0xbb]).unwrap();
        assert_eq!(header, Header::new(ResponseKind::Error, 2));
    }

    #[test]
    fn header_decode_short_input() {
        for len in 0..HEADER_SIZE {
            let result = Header::decode(&[0u8; HEADER_SIZE][..len]);
            assert!(matches!(
                result,
                Err(ProtocolError::MalformedHeader { expected: 5, received }) if received == len
            ));
        }
    }

    #[test]
    fn kinds_from_bytes() {
        assert_eq!(RequestKind::try_from(7).unwrap(), RequestKind::DeleteUser);
        assert!(matches!(
            RequestKind::try_from(8),
            Err(ProtocolError::UnknownKind { context: "request", kind: 8 })
        ));
        assert_eq!(ResponseKind::try_from(8).unwrap(), ResponseKind::Error);
        assert!(ResponseKind::try_from(9).is_err());
        assert_eq!(DataKind::try_from(1).unwrap(), DataKind::Message);
        assert!(DataKind::try_from(3).is_err());
        for byte in 0..=7u8 {
            let kind = RequestKind::try_from(byte).unwrap();
            assert_eq!(u8::from(kind), byte);
            assert_eq!(u8::from(ResponseKind::try_from(byte).unwrap()), byte);
        }
    }

    #[test]
    fn string_field_layout() {
        let mut writer = PayloadWriter::new();
        writer.put_str("hé");
        assert_eq!(writer.into_bytes(), vec![0, 0, 0, 3, b'h', 0xc3, 0xa9]);
    }

    #[test]
    fn empty_string_field() {
        let payload = String::new().to_payload();
        assert_eq!(payload, vec![0, 0, 0, 0]);
        assert_eq!(String::from_payload(&payload).unwrap(), "");
    }

    #[test]
    fn reader_primitives() {
        let mut writer = PayloadWriter::new();
        writer.put_u8(9);
        writer.put_u32(77);
        writer.put_f64(1.5);
        writer.put_bool(true);
        writer.put_id(&MessageId::from_u128(5));
        let bytes = writer.into_bytes();

        let mut reader = PayloadReader::new(&bytes);
        assert_eq!(reader.get_u8().unwrap(), 9);
        assert_eq!(reader.get_u32().unwrap(), 77);
        assert_eq!(reader.get_f64().unwrap(), 1.5);
        assert!(reader.get_bool("flag").unwrap());
        assert_eq!(reader.get_id().unwrap(), MessageId::from_u128(5));
        reader.finish().unwrap();
    }

    #[test]
    fn string_length_beyond_input_is_truncation() {
        // Declares 100 bytes, supplies 2.
        let bytes = [0, 0, 0, 100, b'h', b'i'];
        let result = String::from_payload(&bytes);
        assert!(matches!(
            result,
            Err(ProtocolError::TruncatedPayload { needed: 100, available: 2 })
        ));
    }

    #[test]
    fn huge_list_count_does_not_preallocate() {
        let bytes = [0xff, 0xff, 0xff, 0xff];
        let result = PayloadReader::new(&bytes).get_list::<MessageId>();
        assert!(matches!(result, Err(ProtocolError::TruncatedPayload { .. })));
    }

    #[test]
    fn invalid_bool_byte() {
        let mut reader = PayloadReader::new(&[2]);
        assert!(matches!(
            reader.get_bool("read"),
            Err(ProtocolError::InvalidValue { field: "read", value: 2 })
        ));
    }

    #[test]
    fn invalid_utf8() {
        let bytes = [0, 0, 0, 2, 0xff, 0xfe];
        assert!(matches!(
            String::from_payload(&bytes),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = "ok".to_string().to_payload();
        bytes.push(0);
        assert!(matches!(
            String::from_payload(&bytes),
            Err(ProtocolError::TrailingBytes { remaining: 1 })
        ));
    }

    #[test]
    fn string_list() {
        let names = vec!["user1".to_string(), String::new(), "user2".to_string()];
        let mut writer = PayloadWriter::new();
        writer.put_list(&names);
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 3]);

        let mut reader = PayloadReader::new(&bytes);
        assert_eq!(reader.get_list::<String>().unwrap(), names);
        reader.finish().unwrap();
    }

    #[test]
    fn elements_carry_their_size() {
        let names = vec!["ab".to_string(), "cde".to_string()];
        let mut writer = PayloadWriter::new();
        writer.put_elements(DataKind::List, &names);
        let bytes = writer.into_bytes();
        // count, then header(kind=2, size=4+2) + body
        assert_eq!(&bytes[..9], &[0, 0, 0, 2, 2, 0, 0, 0, 6]);

        let mut reader = PayloadReader::new(&bytes);
        assert_eq!(reader.get_elements::<String>(DataKind::List).unwrap(), names);
    }

    #[test]
    fn element_kind_mismatch() {
        let mut writer = PayloadWriter::new();
        writer.put_elements(DataKind::List, &["x".to_string()]);
        let bytes = writer.into_bytes();
        let result = PayloadReader::new(&bytes).get_elements::<String>(DataKind::Message);
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedElement { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn element_with_slack_is_rejected() {
        // Element header declares 6 bytes but the string inside only uses 5.
        let bytes = [0, 0, 0, 1, 1, 0, 0, 0, 6, 0, 0, 0, 1, b'x', 0];
        let result = PayloadReader::new(&bytes).get_elements::<String>(DataKind::Message);
        assert!(matches!(result, Err(ProtocolError::TrailingBytes { remaining: 1 })));
    }

    #[test]
    fn truncated_element_header() {
        let bytes = [0, 0, 0, 1, 1, 0];
        let result = PayloadReader::new(&bytes).get_elements::<String>(DataKind::Message);
        assert!(matches!(
            result,
            Err(ProtocolError::TruncatedPayload { needed: 5, available: 2 })
        ));
    }
}
