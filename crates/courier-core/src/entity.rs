//! Domain entities held by the server.
//!
//! - [`MessageId`]: the 128-bit identifier naming a message
//! - [`Message`]: a message with its sender, receiver, body and read flag
//! - [`User`]: an account with its credentials, online flag and inbox

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 128-bit identifier uniquely naming a [`Message`].
///
/// Identifiers are minted by the sending client, not by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Size of an identifier on the wire.
    pub const LEN: usize = 16;

    /// Mints a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds an identifier from its 16 raw bytes.
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Builds an identifier from a 128-bit integer (handy for fixtures).
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the 16 raw bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        self.0.as_bytes()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A message from one user to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Username of the author.
    pub sender: String,
    /// Username of the recipient; the message lives in this user's inbox.
    pub receiver: String,
    /// Message text.
    pub body: String,
    /// Unix time of creation, in fractional seconds.
    pub timestamp: f64,
    /// Whether the recipient has read the message.
    pub read: bool,
}

impl Message {
    /// Creates an unread message with a fresh id, stamped with the current time.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            receiver: receiver.into(),
            body: body.into(),
            timestamp: unix_now(),
            read: false,
        }
    }

    /// Builder: set the identifier.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    /// Builder: set the timestamp.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Marks the message as read. Marking twice is harmless.
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique account name.
    pub username: String,
    /// Password, compared by exact equality.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Ids of the messages received by this user.
    pub message_ids: HashSet<MessageId>,
    /// Whether the user currently has an authenticated connection.
    pub online: bool,
}

impl User {
    /// Creates a user with an empty inbox. New accounts start online since
    /// creating an account authenticates the connection that created it.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            message_ids: HashSet::new(),
            online: true,
        }
    }

    /// Adds a message to the inbox. Returns false if it was already there.
    pub fn add_message(&mut self, id: MessageId) -> bool {
        self.message_ids.insert(id)
    }

    /// Removes a message from the inbox. Returns false if it was not there.
    pub fn remove_message(&mut self, id: &MessageId) -> bool {
        self.message_ids.remove(id)
    }

    /// Returns true if the message is in this user's inbox.
    pub fn owns(&self, id: &MessageId) -> bool {
        self.message_ids.contains(id)
    }

    pub fn login(&mut self) {
        self.online = true;
    }

    pub fn logout(&mut self) {
        self.online = false;
    }
}

/// Current Unix time in fractional seconds.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_bytes_roundtrip() {
        let id = MessageId::from_u128(0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10);
        let bytes = *id.as_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[15], 0x10);
        assert_eq!(MessageId::from_bytes(bytes), id);
    }

    #[test]
    fn message_id_display_parse() {
        let id = MessageId::from_u128(0);
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
        let parsed: MessageId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<MessageId>().is_err());
    }

    #[test]
    fn fresh_ids_differ() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn message_new_is_unread_and_stamped() {
        let before = unix_now();
        let msg = Message::new("user1", "user2", "hello");
        assert!(!msg.read);
        assert!(msg.timestamp >= before);
        assert_eq!(msg.sender, "user1");
        assert_eq!(msg.receiver, "user2");
    }

    #[test]
    fn message_value_equality() {
        let id = MessageId::from_u128(7);
        let a = Message::new("user1", "user2", "hello world")
            .with_id(id)
            .with_timestamp(0.0);
        let b = Message::new("user1", "user2", "hello world!")
            .with_id(id)
            .with_timestamp(0.0);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let mut msg = Message::new("a", "b", "c");
        msg.mark_read();
        msg.mark_read();
        assert!(msg.read);
    }

    #[test]
    fn user_inbox() {
        let mut user = User::new("user1", "password");
        assert!(user.online);

        let id = MessageId::from_u128(1);
        assert!(user.add_message(id));
        assert!(!user.add_message(id));
        assert!(user.owns(&id));

        assert!(user.remove_message(&id));
        assert!(!user.remove_message(&id));
        assert!(!user.owns(&id));
    }

    #[test]
    fn user_online_toggle() {
        let mut user = User::new("user1", "password");
        user.logout();
        assert!(!user.online);
        user.login();
        assert!(user.online);
    }

    #[test]
    fn user_inequality_on_inbox() {
        let mut a = User::new("user1", "password");
        let b = User::new("user1", "password");
        a.add_message(MessageId::from_u128(3));
        assert_ne!(a, b);
    }

    #[test]
    fn user_json_omits_password() {
        let user = User::new("user1", "secret");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"username\":\"user1\""));
    }
}
