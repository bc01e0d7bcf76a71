use crate::network::codec::ServerEvent;
use crate::session::state::{AdminPresence, SessionPhase};

use super::types::ChatMessage;

/// What the transport reports upward.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Server(ServerEvent),
}

/// State changes the chat session pushes to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    HistoryLoaded(Vec<ChatMessage>),
    /// The view should scroll to this newest entry.
    MessageAppended(ChatMessage),
    AdminPresence(AdminPresence),
    RemoteTyping(bool),
    /// Blocking, user-visible failure (send rejected by the server).
    Alert(String),
    InputCleared,
}
