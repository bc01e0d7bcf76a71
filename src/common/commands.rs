use crate::network::codec::ClientEvent;

/// Intent the UI forwards to the chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Composer text changed (one per keystroke).
    InputChanged(String),
    /// Send whatever is currently in the composer.
    Send,
    /// User closed the widget.
    Close,
}

/// Instruction from the chat session to its transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Emit(ClientEvent),
    Close,
}
