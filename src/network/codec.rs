//! Wire vocabulary of the chat socket.
//!
//! Every frame is a JSON text message `{"event": <name>, "data": <payload>}`.
//! Frames are turned into typed values here so that nothing past the
//! transport ever matches on event-name strings.

use serde::{Deserialize, Serialize};

use crate::common::{ChatMessage, SenderRole};
use crate::error::ChatResult;

/// Events the server pushes to a customer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Broadcast copy of a message in the room.
    NewMessage(ChatMessage),
    /// Server-confirmed copy of the message this client sent.
    MessageSent(ChatMessage),
    MessageError(MessageRejected),
    UserTyping(TypingSignal),
    AdminStatus(AdminStatus),
}

/// Events a customer session emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinChat(JoinRoom),
    SendMessage(ChatMessage),
    Typing(TypingSignal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub user_id: String,
    pub role: SenderRole,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    #[serde(alias = "sender_role", alias = "role")]
    pub sender_role: SenderRole,
    #[serde(alias = "is_typing")]
    pub is_typing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    #[serde(alias = "is_online", alias = "online")]
    pub is_online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRejected {
    #[serde(default = "default_rejection", alias = "message")]
    pub error: String,
}

fn default_rejection() -> String {
    "Message could not be sent".to_string()
}

pub fn decode(frame: &str) -> ChatResult<ServerEvent> {
    Ok(serde_json::from_str(frame)?)
}

pub fn encode(event: &ClientEvent) -> ChatResult<String> {
    Ok(serde_json::to_string(event)?)
}
