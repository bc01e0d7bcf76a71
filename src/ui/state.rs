use crate::common::{ChatMessage, SessionEvent, UserProfile};
use crate::session::{AdminPresence, ConnectionStatus, MessageLog, SessionPhase};

/// What the widget shows, kept in step with the session through
/// [`SessionEvent`]s.
pub struct AppState {
    pub user: UserProfile,
    pub messages: MessageLog,
    pub input_text: String,
    pub phase: SessionPhase,
    pub admin_presence: AdminPresence,
    pub remote_typing: bool,
    /// Send failure waiting to be acknowledged.
    pub alert: Option<String>,
    /// Set on every append; the chat area consumes it to jump to the newest
    /// entry.
    pub scroll_to_bottom: bool,
}

impl AppState {
    pub fn new(user: UserProfile) -> Self {
        Self {
            user,
            messages: MessageLog::new(),
            input_text: String::new(),
            phase: SessionPhase::Idle,
            admin_presence: AdminPresence::Offline,
            remote_typing: false,
            alert: None,
            scroll_to_bottom: false,
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::PhaseChanged(phase) => self.phase = phase,
            SessionEvent::HistoryLoaded(history) => {
                self.messages.merge_history(history);
                self.scroll_to_bottom = true;
            }
            SessionEvent::MessageAppended(message) => self.push_message(message),
            SessionEvent::AdminPresence(presence) => self.admin_presence = presence,
            SessionEvent::RemoteTyping(is_typing) => self.remote_typing = is_typing,
            SessionEvent::Alert(reason) => self.alert = Some(reason),
            SessionEvent::InputCleared => self.input_text.clear(),
        }
    }

    fn push_message(&mut self, message: ChatMessage) {
        self.messages.append(message);
        self.scroll_to_bottom = true;
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.phase.connection_status()
    }

    pub fn input_enabled(&self) -> bool {
        self.connection() == ConnectionStatus::Connected && self.alert.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_closed()
    }

    pub fn is_own(&self, message: &ChatMessage) -> bool {
        message.sender_id == self.user.id
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}
