//! TCP client for communicating with the courier server.
//!
//! One client holds one persistent connection; requests are answered strictly
//! in order, so every call writes one frame and reads one frame back.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use courier_core::{Message, MessageId};
use courier_protocol::{HEADER_SIZE, Header, MAX_PAYLOAD_SIZE, Request, Response};

use crate::error::{ClientError, ClientResult};

/// Client for communicating with the courier server over TCP.
pub struct SocketClient {
    stream: TcpStream,
    address: String,
    timeout: Duration,
}

impl SocketClient {
    /// Connects to the server at `host:port`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> ClientResult<Self> {
        let address = format!("{}:{}", host, port);
        debug!(address = %address, "connecting to server");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "connection timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| ClientError::Connection(format!("failed to connect to {}: {}", address, e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            address,
            timeout,
        })
    }

    /// Returns the server address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sends a request and waits for its response, which may be an `Error`.
    pub async fn send(&mut self, request: Request) -> ClientResult<Response> {
        let frame = request.to_frame()?;
        debug!(kind = ?request.kind(), bytes = frame.len(), "sending request");

        tokio::time::timeout(self.timeout, async {
            self.stream.write_all(&frame).await?;
            self.stream.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|_| ClientError::Timeout("sending request".into()))??;

        let (header, payload) = tokio::time::timeout(self.timeout, self.read_frame())
            .await
            .map_err(|_| ClientError::Timeout("reading response".into()))??;

        let response = Response::decode(header.kind, &payload)?;
        debug!(kind = ?response.kind(), "response received");
        Ok(response)
    }

    async fn read_frame(&mut self) -> ClientResult<(Header, Vec<u8>)> {
        let mut header_buf = [0u8; HEADER_SIZE];
        self.stream.read_exact(&mut header_buf).await?;
        let header = Header::decode(&header_buf)?;

        if header.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ClientError::Protocol(format!(
                "response too large: {} bytes (max: {})",
                header.payload_size, MAX_PAYLOAD_SIZE
            )));
        }

        let mut payload = vec![0u8; header.payload_size as usize];
        self.stream.read_exact(&mut payload).await?;
        Ok((header, payload))
    }

    /// Like [`send`](Self::send), but an `Error` response becomes
    /// [`ClientError::Rejected`].
    async fn call(&mut self, request: Request) -> ClientResult<Response> {
        match self.send(request).await? {
            Response::Error(err) => Err(ClientError::Rejected(err.message)),
            response => Ok(response),
        }
    }

    async fn call_ack(&mut self, request: Request, expected: Response) -> ClientResult<()> {
        let response = self.call(request).await?;
        if response == expected {
            Ok(())
        } else {
            Err(unexpected(&response))
        }
    }

    pub async fn echo(&mut self, text: &str) -> ClientResult<String> {
        match self.call(Request::echo(text)).await? {
            Response::Echo(text) => Ok(text),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn create_account(&mut self, username: &str, password: &str) -> ClientResult<()> {
        self.call_ack(
            Request::create_account(username, password),
            Response::Authenticate,
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<()> {
        self.call_ack(Request::login(username, password), Response::Authenticate)
            .await
    }

    pub async fn get_messages(&mut self, username: &str) -> ClientResult<Vec<Message>> {
        match self.call(Request::get_messages(username)).await? {
            Response::GetMessages(resp) => Ok(resp.messages),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list_users(&mut self, username: &str, pattern: &str) -> ClientResult<Vec<String>> {
        match self.call(Request::list_users(username, pattern)).await? {
            Response::ListUsers(resp) => Ok(resp.usernames),
            other => Err(unexpected(&other)),
        }
    }

    /// Sends a message on behalf of its sender.
    pub async fn send_message(&mut self, message: Message) -> ClientResult<()> {
        let username = message.sender.clone();
        self.call_ack(
            Request::send_message(username, message),
            Response::SendMessage,
        )
        .await
    }

    pub async fn read_messages(&mut self, username: &str, ids: Vec<MessageId>) -> ClientResult<()> {
        self.call_ack(
            Request::read_messages(username, ids),
            Response::ReadMessages,
        )
        .await
    }

    pub async fn delete_messages(
        &mut self,
        username: &str,
        ids: Vec<MessageId>,
    ) -> ClientResult<()> {
        self.call_ack(
            Request::delete_messages(username, ids),
            Response::DeleteMessages,
        )
        .await
    }

    pub async fn delete_user(&mut self, username: &str) -> ClientResult<()> {
        self.call_ack(Request::delete_user(username), Response::DeleteUser)
            .await
    }
}

fn unexpected(response: &Response) -> ClientError {
    ClientError::Protocol(format!("unexpected response: {:?}", response.kind()))
}
