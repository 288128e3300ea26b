//! Per-connection readiness loop.
//!
//! A connection waits for its socket to become readable (and writable while
//! responses are queued), then performs at most one non-blocking read and
//! one non-blocking write. Partial reads accumulate in the receive buffer
//! until the [`FrameDecoder`] can split off a whole frame; partial writes
//! leave the unsent tail queued for the next writable event.

use std::io;
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tokio::io::Interest;
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use courier_protocol::{FrameDecoder, Request, Response};

use crate::error::ServerResult;
use crate::handler::{RequestHandler, Session};

/// Bytes reserved in the receive buffer before each read.
const READ_CHUNK: usize = 4096;

/// An accepted client connection and its context.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    inbound: BytesMut,
    outbound: BytesMut,
    decoder: FrameDecoder,
    session: Session,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            inbound: BytesMut::with_capacity(READ_CHUNK),
            outbound: BytesMut::new(),
            decoder: FrameDecoder::new(),
            session: Session::new(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Serves requests until the peer disconnects or breaks the protocol,
    /// then marks the connection's user offline.
    #[tracing::instrument(name = "connection", skip_all, fields(peer = %self.peer))]
    pub async fn serve(mut self, handler: &RequestHandler) -> ServerResult<()> {
        let result = self.run(handler).await;
        handler.disconnect(&self.session).await;
        debug!(pending = self.outbound.len(), "Connection closed");
        result
    }

    async fn run(&mut self, handler: &RequestHandler) -> ServerResult<()> {
        loop {
            let interest = if self.outbound.is_empty() {
                Interest::READABLE
            } else {
                Interest::READABLE | Interest::WRITABLE
            };
            let ready = self.stream.ready(interest).await?;

            if ready.is_readable() {
                self.inbound.reserve(READ_CHUNK);
                match self.stream.try_read_buf(&mut self.inbound) {
                    Ok(0) => {
                        if self.decoder.is_mid_frame() || !self.inbound.is_empty() {
                            debug!(buffered = self.inbound.len(), "Peer closed mid-frame");
                        }
                        return Ok(());
                    }
                    Ok(n) => {
                        trace!(bytes = n, "Read");
                        self.dispatch_frames(handler).await?;
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => return Err(e.into()),
                }
            }

            if ready.is_writable() && !self.outbound.is_empty() {
                match self.stream.try_write(&self.outbound) {
                    Ok(n) => {
                        trace!(bytes = n, queued = self.outbound.len() - n, "Wrote");
                        self.outbound.advance(n);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    /// Handles every complete frame in the receive buffer, in arrival order.
    async fn dispatch_frames(&mut self, handler: &RequestHandler) -> ServerResult<()> {
        while let Some(frame) = self.decoder.decode(&mut self.inbound)? {
            let request = Request::from_frame(&frame)?;
            debug!(kind = ?request.kind(), size = frame.payload.len(), "Received request");

            let response = handler.handle(&mut self.session, request).await;
            self.queue(&response)?;
        }
        Ok(())
    }

    fn queue(&mut self, response: &Response) -> ServerResult<()> {
        let bytes = match response.to_frame() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, kind = ?response.kind(), "Response could not be framed");
                Response::error(format!("Response could not be sent: {e}")).to_frame()?
            }
        };
        self.outbound.extend_from_slice(&bytes);
        Ok(())
    }
}
