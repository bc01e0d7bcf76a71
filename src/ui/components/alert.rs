use eframe::egui;

use crate::ui::state::AppState;

/// Blocking notice for a message the server refused.
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    let Some(reason) = state.alert.as_deref() else {
        return;
    };

    let mut dismissed = false;
    egui::Window::new("Message not sent")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(reason);
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

    if dismissed {
        state.dismiss_alert();
    }
}
