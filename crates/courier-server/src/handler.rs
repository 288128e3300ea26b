//! Request/response dispatch handler.
//!
//! This module owns the user and message tables and the per-operation logic
//! that mutates them. The connection loop hands every decoded request to
//! [`RequestHandler::handle`], which answers with exactly one response.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use courier_core::{Message, MessageId, User, WildcardPattern};
use courier_protocol::{AuthAction, AuthRequest, Request, Response};

use crate::error::DomainError;

/// The user and message tables shared by every connection.
#[derive(Debug, Default)]
pub struct ServerState {
    users: HashMap<String, User>,
    messages: HashMap<MessageId, Message>,
    /// Live authenticated connections per user. A user is online while its
    /// count is non-zero.
    connections: HashMap<String, usize>,
}

impl ServerState {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn connection_count(&self, username: &str) -> usize {
        self.connections.get(username).copied().unwrap_or(0)
    }

    fn known_user(&self, username: &str) -> Result<&User, DomainError> {
        self.users
            .get(username)
            .ok_or_else(|| DomainError::UnknownUser(username.to_string()))
    }

    /// Registers a new account, which starts online.
    pub fn create_account(&mut self, username: &str, password: &str) -> Result<(), DomainError> {
        if self.users.contains_key(username) {
            return Err(DomainError::UserExists(username.to_string()));
        }
        self.users
            .insert(username.to_string(), User::new(username, password));
        Ok(())
    }

    /// Checks credentials and marks the user online.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), DomainError> {
        let user = self
            .users
            .get_mut(username)
            .ok_or_else(|| DomainError::UserNotFound(username.to_string()))?;
        if user.password != password {
            return Err(DomainError::WrongPassword);
        }
        user.login();
        Ok(())
    }

    /// Clears the online flag. A no-op if the account is gone.
    pub fn logout(&mut self, username: &str) {
        if let Some(user) = self.users.get_mut(username) {
            user.logout();
        }
    }

    /// Counts one more connection authenticated as `username`.
    pub fn attach(&mut self, username: &str) {
        if let Some(user) = self.users.get_mut(username) {
            user.login();
            *self.connections.entry(username.to_string()).or_default() += 1;
        }
    }

    /// Drops one connection of `username`; the last one takes the user
    /// offline.
    pub fn detach(&mut self, username: &str) {
        let Some(count) = self.connections.get_mut(username) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.connections.remove(username);
            self.logout(username);
        }
    }

    /// Every message in the user's inbox, oldest first.
    pub fn get_messages(&self, username: &str) -> Result<Vec<Message>, DomainError> {
        let user = self.known_user(username)?;
        let mut messages: Vec<Message> = user
            .message_ids
            .iter()
            .filter_map(|id| self.messages.get(id))
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    /// Usernames matching a wildcard pattern, sorted. An invalid pattern
    /// matches nothing.
    pub fn list_users(&self, username: &str, pattern: &str) -> Result<Vec<String>, DomainError> {
        self.known_user(username)?;
        let pattern = match WildcardPattern::new(pattern) {
            Ok(pattern) => pattern,
            Err(e) => {
                debug!(error = %e, "Invalid pattern, returning no users");
                return Ok(Vec::new());
            }
        };

        let mut usernames: Vec<String> = self
            .users
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect();
        usernames.sort();
        Ok(usernames)
    }

    /// Stores a message and files it in the receiver's inbox.
    pub fn send_message(&mut self, username: &str, message: Message) -> Result<(), DomainError> {
        self.known_user(username)?;
        if message.sender != username {
            return Err(DomainError::SenderMismatch {
                sender: message.sender,
                username: username.to_string(),
            });
        }
        if self.messages.contains_key(&message.id) {
            return Err(DomainError::DuplicateMessage(message.id));
        }
        let receiver = self
            .users
            .get_mut(&message.receiver)
            .ok_or_else(|| DomainError::RecipientNotFound(message.receiver.clone()))?;

        receiver.add_message(message.id);
        self.messages.insert(message.id, message);
        Ok(())
    }

    /// Fails unless every id names a message in the user's inbox.
    fn check_inbox(&self, username: &str, ids: &[MessageId]) -> Result<(), DomainError> {
        let user = self.known_user(username)?;
        for id in ids {
            let message = self
                .messages
                .get(id)
                .ok_or(DomainError::UnknownMessage(*id))?;
            if message.receiver != username || !user.owns(id) {
                return Err(DomainError::NotRecipient {
                    id: *id,
                    username: username.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Marks messages read. Nothing changes unless every id is valid; reading
    /// an already-read message succeeds.
    pub fn read_messages(&mut self, username: &str, ids: &[MessageId]) -> Result<(), DomainError> {
        self.check_inbox(username, ids)?;
        for id in ids {
            if let Some(message) = self.messages.get_mut(id) {
                message.mark_read();
            }
        }
        Ok(())
    }

    /// Removes messages from the inbox and the message table. Nothing changes
    /// unless every id is valid.
    pub fn delete_messages(
        &mut self,
        username: &str,
        ids: &[MessageId],
    ) -> Result<(), DomainError> {
        self.check_inbox(username, ids)?;
        if let Some(user) = self.users.get_mut(username) {
            for id in ids {
                user.remove_message(id);
                self.messages.remove(id);
            }
        }
        Ok(())
    }

    /// Erases the account and every message in its inbox.
    pub fn delete_user(&mut self, username: &str) -> Result<(), DomainError> {
        let user = self
            .users
            .remove(username)
            .ok_or_else(|| DomainError::UnknownUser(username.to_string()))?;
        self.connections.remove(username);
        for id in &user.message_ids {
            self.messages.remove(id);
        }
        Ok(())
    }

    /// Logs table sizes and inboxes at DEBUG level.
    pub fn log_snapshot(&self) {
        debug!(
            users = self.users.len(),
            messages = self.messages.len(),
            "State snapshot"
        );
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        for user in users {
            debug!(
                username = %user.username,
                online = user.online,
                inbox = user.message_ids.len(),
                "User"
            );
        }
    }
}

/// Shared server state wrapped in an Arc<RwLock>.
pub type SharedState = Arc<RwLock<ServerState>>;

/// Creates a new shared state.
pub fn new_shared_state() -> SharedState {
    Arc::new(RwLock::new(ServerState::new()))
}

/// Per-connection authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    username: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user this connection last authenticated as.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    fn authenticate(&mut self, username: &str) {
        self.username = Some(username.to_string());
    }

    fn clear(&mut self) {
        self.username = None;
    }

    /// Checks that the connection may issue `request`.
    ///
    /// Echo and Authenticate are always allowed. Everything else needs a
    /// login, and must act as the logged-in user.
    fn authorize(&self, request: &Request) -> Result<(), DomainError> {
        if matches!(request, Request::Echo(_) | Request::Authenticate(_)) {
            return Ok(());
        }
        let current = self.username().ok_or(DomainError::LoginRequired)?;
        match request.username() {
            Some(acting) if acting != current => {
                Err(DomainError::NotLoggedInAs(acting.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Request handler that processes incoming requests and produces responses.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    state: SharedState,
    debug: bool,
}

impl RequestHandler {
    /// Creates a new request handler with the given state.
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            debug: false,
        }
    }

    /// Builder: log a state snapshot after every request.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Handles a single request and returns the response.
    ///
    /// The state lock is held for the whole request, so handlers never
    /// interleave.
    #[tracing::instrument(skip_all, fields(kind = ?request.kind(), user = session.username()))]
    pub async fn handle(&self, session: &mut Session, request: Request) -> Response {
        if let Err(e) = session.authorize(&request) {
            debug!(error = %e, "Rejecting request");
            return Response::error(e.to_string());
        }

        let mut state = self.state.write().await;
        let result = match request {
            Request::Echo(text) => Ok(Response::Echo(text)),
            Request::Authenticate(auth) => authenticate(&mut state, session, auth),
            Request::GetMessages(req) => state.get_messages(&req.username).map(Response::messages),
            Request::ListUsers(req) => state
                .list_users(&req.username, &req.pattern)
                .map(Response::usernames),
            Request::SendMessage(req) => state
                .send_message(&req.username, req.message)
                .map(|()| Response::SendMessage),
            Request::ReadMessages(req) => state
                .read_messages(&req.username, &req.message_ids)
                .map(|()| Response::ReadMessages),
            Request::DeleteMessages(req) => state
                .delete_messages(&req.username, &req.message_ids)
                .map(|()| Response::DeleteMessages),
            Request::DeleteUser(req) => state.delete_user(&req.username).map(|()| {
                info!(username = %req.username, "Account deleted");
                session.clear();
                Response::DeleteUser
            }),
        };

        let response = result.unwrap_or_else(|e| {
            debug!(error = %e, "Request rejected");
            Response::error(e.to_string())
        });

        if self.debug {
            state.log_snapshot();
        }
        response
    }

    /// Releases the connection's user. It goes offline once no other
    /// connection is logged in as it.
    pub async fn disconnect(&self, session: &Session) {
        if let Some(username) = session.username() {
            let mut state = self.state.write().await;
            state.detach(username);
            debug!(
                username = %username,
                connections = state.connection_count(username),
                "Connection released"
            );
        }
    }
}

fn authenticate(
    state: &mut ServerState,
    session: &mut Session,
    auth: AuthRequest,
) -> Result<Response, DomainError> {
    match auth.action {
        AuthAction::CreateAccount => {
            state.create_account(&auth.username, &auth.password)?;
            info!(username = %auth.username, "Account created");
        }
        AuthAction::Login => {
            state.login(&auth.username, &auth.password)?;
            info!(username = %auth.username, "User logged in");
        }
    }
    // Switching users on one connection releases the previous one.
    if session.username() != Some(auth.username.as_str()) {
        if let Some(previous) = session.username() {
            state.detach(previous);
        }
        state.attach(&auth.username);
        session.authenticate(&auth.username);
    }
    Ok(Response::Authenticate)
}
