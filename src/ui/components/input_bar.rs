use eframe::egui;

#[derive(Default)]
pub struct InputActions {
    pub changed: bool,
    pub send: bool,
}

/// Composer row. The text is only cleared once the session accepts the send.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, enabled: bool) -> InputActions {
    let mut actions = InputActions::default();

    ui.add_enabled_ui(enabled, |ui| {
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(input_text)
                    .hint_text("Type a message…")
                    .desired_width(ui.available_width() - 60.0),
            );
            actions.changed = response.changed();

            if ui.button("Send").clicked() {
                actions.send = true;
            }
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                actions.send = true;
                response.request_focus();
            }
        });
    });

    actions.send &= !input_text.trim().is_empty();
    actions
}
