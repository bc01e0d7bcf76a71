use crate::common::ChatMessage;

/// Lifecycle of one mounted chat widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No user, or not mounted yet.
    #[default]
    Idle,
    Connecting,
    Connected,
    /// Transport dropped; the transport itself is retrying.
    Disconnected,
    /// Terminal.
    Closed,
}

impl SessionPhase {
    pub fn connection_status(self) -> ConnectionStatus {
        match self {
            SessionPhase::Connected => ConnectionStatus::Connected,
            _ => ConnectionStatus::Disconnected,
        }
    }

    pub fn is_closed(self) -> bool {
        self == SessionPhase::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminPresence {
    Online,
    #[default]
    Offline,
}

impl AdminPresence {
    pub fn from_online(is_online: bool) -> Self {
        if is_online {
            AdminPresence::Online
        } else {
            AdminPresence::Offline
        }
    }
}

/// Append-only message sequence in arrival order.
///
/// Entries are never reordered by timestamp and never de-duplicated. Prior
/// history can be merged in front of live entries exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
    history_merged: bool,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    /// Places `history` ahead of anything that arrived live. Returns `false`
    /// (and leaves the log untouched) if history was already merged.
    pub fn merge_history(&mut self, mut history: Vec<ChatMessage>) -> bool {
        if self.history_merged {
            return false;
        }
        self.history_merged = true;
        history.append(&mut self.entries);
        self.entries = history;
        true
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the controller tracks for one mount.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub admin_presence: AdminPresence,
    pub local_typing: bool,
    pub remote_typing: bool,
    pub input_text: String,
    pub messages: MessageLog,
}

impl SessionState {
    pub fn connection_status(&self) -> ConnectionStatus {
        self.phase.connection_status()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status() == ConnectionStatus::Connected
    }
}
