//! Frame encoding, incremental decoding, and blocking stream adapters.
//!
//! Every frame is a five-byte header followed by its payload:
//!
//! ```text
//! +-----------+--------------------+-------------------+
//! | kind (u8) | payload_size (BE)  | payload bytes ... |
//! +-----------+--------------------+-------------------+
//! ```

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, Bytes, BytesMut};

use crate::MAX_PAYLOAD_SIZE;
use crate::codec::{HEADER_SIZE, Header};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{Request, Response};

/// A complete frame: its header and exactly `payload_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Bytes,
}

impl Frame {
    pub fn kind(&self) -> u8 {
        self.header.kind
    }
}

/// Encodes a header and payload into one buffer ready for transmission.
///
/// # Example
///
/// ```rust
/// use courier_protocol::{RequestKind, encode_frame};
///
/// let bytes = encode_frame(RequestKind::Echo, b"hi").unwrap();
/// assert_eq!(bytes, [0, 0, 0, 0, 2, b'h', b'i']);
/// ```
pub fn encode_frame(kind: impl Into<u8>, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let header = Header::new(kind, payload.len() as u32);
    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
    buffer.extend_from_slice(&header.encode());
    buffer.extend_from_slice(payload);
    Ok(buffer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Header,
    Payload(Header),
}

/// Most the decoder reserves ahead for a pending payload. Larger payloads
/// grow the buffer as their bytes arrive.
const RESERVE_LIMIT: usize = 64 * 1024;

/// Incremental frame decoder over a growing receive buffer.
///
/// Bytes may arrive in any fragmentation; a header is consumed once five
/// bytes are buffered, and its payload once all of it is buffered.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    max_payload: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD_SIZE)
    }

    pub fn with_max_payload(max_payload: u32) -> Self {
        Self {
            state: DecodeState::Header,
            max_payload,
        }
    }

    /// True when a header has been consumed and its payload is still pending.
    pub fn is_mid_frame(&self) -> bool {
        matches!(self.state, DecodeState::Payload(_))
    }

    /// Takes the next complete frame out of `buf`, if one is buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A header declaring a
    /// payload above the limit is an error.
    pub fn decode(&mut self, buf: &mut BytesMut) -> ProtocolResult<Option<Frame>> {
        let header = match self.state {
            DecodeState::Header => {
                if buf.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let header = Header::decode(&buf[..HEADER_SIZE])?;
                if header.payload_size > self.max_payload {
                    return Err(ProtocolError::PayloadTooLarge {
                        size: header.payload_size as usize,
                        max: self.max_payload,
                    });
                }
                buf.advance(HEADER_SIZE);
                self.state = DecodeState::Payload(header);
                header
            }
            DecodeState::Payload(header) => header,
        };

        let size = header.payload_size as usize;
        if buf.len() < size {
            buf.reserve((size - buf.len()).min(RESERVE_LIMIT));
            return Ok(None);
        }

        self.state = DecodeState::Header;
        Ok(Some(Frame {
            header,
            payload: buf.split_to(size).freeze(),
        }))
    }
}

/// Reads frames from a blocking byte stream.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads a single frame.
    ///
    /// Returns `Ok(None)` on EOF before any byte of a new frame. EOF partway
    /// through a frame is a truncation error.
    pub fn read_frame(&mut self) -> ProtocolResult<Option<Frame>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.reader.read(&mut header_buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(ProtocolError::truncated(HEADER_SIZE, filled)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let header = Header::decode(&header_buf)?;
        if header.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: header.payload_size as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut payload = vec![0u8; header.payload_size as usize];
        self.read_payload(&mut payload)?;

        Ok(Some(Frame {
            header,
            payload: Bytes::from(payload),
        }))
    }

    fn read_payload(&mut self, payload: &mut [u8]) -> ProtocolResult<()> {
        let mut filled = 0;
        while filled < payload.len() {
            match self.reader.read(&mut payload[filled..]) {
                Ok(0) => return Err(ProtocolError::truncated(payload.len(), filled)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn read_request(&mut self) -> ProtocolResult<Option<Request>> {
        self.read_frame()?
            .map(|frame| Request::from_frame(&frame))
            .transpose()
    }

    pub fn read_response(&mut self) -> ProtocolResult<Option<Response>> {
        self.read_frame()?
            .map(|frame| Response::from_frame(&frame))
            .transpose()
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes frames to a blocking byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_request(&mut self, request: &Request) -> ProtocolResult<()> {
        self.writer.write_all(&request.to_frame()?)?;
        Ok(())
    }

    pub fn write_response(&mut self, response: &Response) -> ProtocolResult<()> {
        self.writer.write_all(&response.to_frame()?)?;
        Ok(())
    }

    pub fn flush(&mut self) -> ProtocolResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
