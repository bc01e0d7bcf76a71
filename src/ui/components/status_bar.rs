use eframe::egui;

use crate::session::{AdminPresence, SessionPhase};
use crate::ui::state::AppState;

/// Header with admin presence and the connection banner. Returns `true` when
/// the user asked to close the widget.
pub fn render(ui: &mut egui::Ui, state: &AppState) -> bool {
    let mut close = false;

    ui.horizontal(|ui| {
        ui.heading("Customer support");

        let (color, label) = match state.admin_presence {
            AdminPresence::Online => (egui::Color32::GREEN, "online"),
            AdminPresence::Offline => (egui::Color32::GRAY, "offline"),
        };
        ui.colored_label(color, "●");
        ui.label(egui::RichText::new(label).weak());

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("✕").on_hover_text("Close chat").clicked() {
                close = true;
            }
        });
    });

    if let Some(banner) = connection_banner(state.phase) {
        ui.colored_label(egui::Color32::YELLOW, banner);
    }

    close
}

pub fn typing_indicator(ui: &mut egui::Ui, state: &AppState) {
    if state.remote_typing {
        ui.label(egui::RichText::new("Support is typing…").italics().weak());
    }
}

fn connection_banner(phase: SessionPhase) -> Option<&'static str> {
    match phase {
        SessionPhase::Idle | SessionPhase::Connecting => Some("Connecting…"),
        SessionPhase::Disconnected => Some("Connection lost. Reconnecting…"),
        SessionPhase::Connected | SessionPhase::Closed => None,
    }
}
