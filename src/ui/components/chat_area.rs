use chrono::Local;
use eframe::egui;

use crate::common::{ChatMessage, SenderRole};
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    egui::ScrollArea::vertical()
        .auto_shrink([false; 2])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if state.messages.is_empty() {
                ui.label(egui::RichText::new("Ask us anything about your order.").weak());
            }

            for message in state.messages.entries() {
                render_message(ui, message, state.is_own(message));
            }

            if state.scroll_to_bottom {
                ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
            }
        });

    state.scroll_to_bottom = false;
}

fn render_message(ui: &mut egui::Ui, message: &ChatMessage, own: bool) {
    let (layout, fill) = if own {
        (
            egui::Layout::right_to_left(egui::Align::TOP),
            ui.visuals().selection.bg_fill,
        )
    } else {
        (
            egui::Layout::left_to_right(egui::Align::TOP),
            ui.visuals().faint_bg_color,
        )
    };

    ui.with_layout(layout, |ui| {
        egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
            ui.vertical(|ui| {
                ui.label(egui::RichText::new(sender_label(message, own)).small().strong());
                ui.label(&message.message);
                if let Some(time) = display_time(message) {
                    ui.label(egui::RichText::new(time).small().weak());
                }
            });
        });
    });
}

fn sender_label(message: &ChatMessage, own: bool) -> &'static str {
    match (own, message.sender_role) {
        (true, _) => "You",
        (false, SenderRole::Admin) => "Support",
        (false, SenderRole::Customer) => "Customer",
    }
}

fn display_time(message: &ChatMessage) -> Option<String> {
    message
        .created_at
        .map(|at| at.with_timezone(&Local).format("%d/%m %H:%M").to_string())
}
