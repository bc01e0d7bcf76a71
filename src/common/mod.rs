pub mod commands;
pub mod events;
pub mod types;

pub use commands::{TransportCommand, UiCommand};
pub use events::{SessionEvent, TransportEvent};
pub use types::{ChatMessage, SenderRole, SessionContext, UserProfile};
