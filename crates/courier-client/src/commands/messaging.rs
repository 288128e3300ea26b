//! Messaging commands: one request (after logging in) per invocation.

use chrono::{DateTime, Local};
use serde::Serialize;

use courier_core::{Message, MessageId};

use crate::cli::Credentials;
use crate::error::{ClientError, ClientResult};
use crate::socket::SocketClient;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> ClientResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Protocol(format!("failed to serialize output: {}", e)))
}

async fn login(client: &mut SocketClient, credentials: &Credentials) -> ClientResult<()> {
    client
        .login(&credentials.user, &credentials.password)
        .await
}

pub async fn echo(client: &mut SocketClient, text: &str, output: Output) -> ClientResult<()> {
    let echoed = client.echo(text).await?;
    match output {
        Output::Text => println!("{}", echoed),
        Output::Json => println!("{}", to_json(&echoed)?),
    }
    Ok(())
}

pub async fn register(client: &mut SocketClient, credentials: &Credentials) -> ClientResult<()> {
    client
        .create_account(&credentials.user, &credentials.password)
        .await?;
    println!("Account \"{}\" created.", credentials.user);
    Ok(())
}

pub async fn messages(
    client: &mut SocketClient,
    credentials: &Credentials,
    unread_only: bool,
    output: Output,
) -> ClientResult<()> {
    login(client, credentials).await?;
    let mut messages = client.get_messages(&credentials.user).await?;
    if unread_only {
        messages.retain(|m| !m.read);
    }
    println!("{}", render_messages(&messages, output)?);
    Ok(())
}

pub async fn users(
    client: &mut SocketClient,
    credentials: &Credentials,
    pattern: &str,
    output: Output,
) -> ClientResult<()> {
    login(client, credentials).await?;
    let usernames = client.list_users(&credentials.user, pattern).await?;
    match output {
        Output::Text => {
            for name in &usernames {
                println!("{}", name);
            }
        }
        Output::Json => println!("{}", to_json(&usernames)?),
    }
    Ok(())
}

pub async fn send(
    client: &mut SocketClient,
    credentials: &Credentials,
    to: &str,
    body: &str,
) -> ClientResult<()> {
    login(client, credentials).await?;
    let message = Message::new(&credentials.user, to, body);
    let id = message.id;
    client.send_message(message).await?;
    println!("Sent message {}", id);
    Ok(())
}

pub async fn read(
    client: &mut SocketClient,
    credentials: &Credentials,
    ids: Vec<MessageId>,
) -> ClientResult<()> {
    login(client, credentials).await?;
    let count = ids.len();
    client.read_messages(&credentials.user, ids).await?;
    println!("Marked {} message(s) as read.", count);
    Ok(())
}

pub async fn delete(
    client: &mut SocketClient,
    credentials: &Credentials,
    ids: Vec<MessageId>,
) -> ClientResult<()> {
    login(client, credentials).await?;
    let count = ids.len();
    client.delete_messages(&credentials.user, ids).await?;
    println!("Deleted {} message(s).", count);
    Ok(())
}

pub async fn delete_account(
    client: &mut SocketClient,
    credentials: &Credentials,
) -> ClientResult<()> {
    login(client, credentials).await?;
    client.delete_user(&credentials.user).await?;
    println!("Account \"{}\" deleted.", credentials.user);
    Ok(())
}

/// Renders an inbox, one line per message in text mode.
pub fn render_messages(messages: &[Message], output: Output) -> ClientResult<String> {
    match output {
        Output::Json => to_json(messages),
        Output::Text if messages.is_empty() => Ok("No messages.".to_string()),
        Output::Text => Ok(messages
            .iter()
            .map(format_message)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// `<id>  <time>  <sender>  [*]<body>`, with `*` marking unread messages.
pub fn format_message(message: &Message) -> String {
    let marker = if message.read { "" } else { "*" };
    format!(
        "{}  {}  {}  {}{}",
        message.id,
        format_timestamp(message.timestamp),
        message.sender,
        marker,
        message.body
    )
}

fn format_timestamp(timestamp: f64) -> String {
    DateTime::from_timestamp_micros((timestamp * 1_000_000.0) as i64)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(read: bool) -> Message {
        let mut message = Message::new("alice", "bob", "hello")
            .with_id(MessageId::from_u128(1))
            .with_timestamp(0.0);
        if read {
            message.mark_read();
        }
        message
    }

    #[test]
    fn unread_marker() {
        let line = format_message(&sample(false));
        assert!(line.starts_with("00000000-0000-0000-0000-000000000001"));
        assert!(line.ends_with("alice  *hello"));

        let line = format_message(&sample(true));
        assert!(line.ends_with("alice  hello"));
    }

    #[test]
    fn empty_inbox_text() {
        assert_eq!(render_messages(&[], Output::Text).unwrap(), "No messages.");
    }

    #[test]
    fn json_output_uses_string_ids() {
        let json = render_messages(&[sample(false)], Output::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["id"], "00000000-0000-0000-0000-000000000001");
        assert_eq!(value[0]["sender"], "alice");
        assert_eq!(value[0]["read"], false);
    }

    #[test]
    fn output_from_flag() {
        assert_eq!(Output::from_flag(true), Output::Json);
        assert_eq!(Output::from_flag(false), Output::Text);
    }
}
