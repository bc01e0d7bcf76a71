use eframe::egui;

use crate::common::UiCommand;
use crate::session::SessionLink;

use super::components::{alert, chat_area, input_bar, status_bar};
use super::state::AppState;

/// Live chat window. Renders nothing when no customer is signed in, and
/// nothing once the chat has been closed.
pub struct ChatApp {
    widget: Option<ChatWidget>,
}

struct ChatWidget {
    state: AppState,
    link: SessionLink,
}

impl ChatApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, link: Option<SessionLink>) -> Self {
        Self {
            widget: link.map(|link| ChatWidget {
                state: AppState::new(link.user.clone()),
                link,
            }),
        }
    }
}

impl ChatWidget {
    fn handle_session_events(&mut self) {
        while let Ok(event) = self.link.events.try_recv() {
            self.state.apply(event);
        }
    }

    fn send_command(&self, command: UiCommand) {
        if let Err(err) = self.link.commands.try_send(command) {
            log::warn!("Failed to send command to chat session: {err}");
        }
    }

    /// Draws one frame. Returns `false` once the user closed the chat.
    fn show(&mut self, ctx: &egui::Context) -> bool {
        let mut close = false;

        egui::TopBottomPanel::top("chat_status").show(ctx, |ui| {
            close = status_bar::render(ui, &self.state);
        });

        egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
            status_bar::typing_indicator(ui, &self.state);
            let enabled = self.state.input_enabled();
            let actions = input_bar::render(ui, &mut self.state.input_text, enabled);
            if actions.changed {
                self.send_command(UiCommand::InputChanged(self.state.input_text.clone()));
            }
            if actions.send {
                self.send_command(UiCommand::Send);
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            chat_area::render(ui, &mut self.state);
        });

        alert::render(ctx, &mut self.state);

        if close {
            self.send_command(UiCommand::Close);
        }
        !close
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };

        widget.handle_session_events();
        if widget.state.is_closed() || !widget.show(ctx) {
            log::info!("Chat widget closed");
            self.widget = None;
        }
    }
}
