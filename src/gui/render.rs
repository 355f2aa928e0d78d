//! GUI rendering functions.
//!
//! Contains UI layout and component rendering logic.

use eframe::egui::{self, Color32, RichText};

use crate::automation::events::{LogLevel, RunStatus};

use super::state::GuiState;

fn level_color(level: LogLevel) -> Color32 {
    match level {
        LogLevel::Info => Color32::from_gray(200),
        LogLevel::Warning => Color32::from_rgb(230, 170, 0),
        LogLevel::Error => Color32::from_rgb(220, 50, 50),
        LogLevel::Success => Color32::from_rgb(0, 170, 70),
    }
}

/// Render the start/stop buttons.
/// Returns (start_clicked, stop_clicked).
pub fn render_controls(ui: &mut egui::Ui, state: &GuiState) -> (bool, bool) {
    let mut start_clicked = false;
    let mut stop_clicked = false;

    ui.horizontal(|ui| {
        let is_running = state.is_running();

        ui.add_enabled_ui(!is_running, |ui| {
            if ui.button(RichText::new("▶ Start").size(16.0)).clicked() {
                start_clicked = true;
            }
        });

        ui.add_space(20.0);

        ui.add_enabled_ui(is_running, |ui| {
            if ui.button(RichText::new("◼ Stop").size(16.0)).clicked() {
                stop_clicked = true;
            }
        });
    });

    (start_clicked, stop_clicked)
}

/// Render status and counters.
pub fn render_progress(ui: &mut egui::Ui, state: &GuiState) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label("Status:");

        let status_color = match state.status {
            RunStatus::Idle => Color32::GRAY,
            RunStatus::Running => Color32::from_rgb(0, 120, 200),
            RunStatus::Stopped => Color32::from_rgb(200, 150, 0),
        };
        ui.label(RichText::new(state.status.to_string()).color(status_color));
    });

    ui.add_space(4.0);
    egui::Grid::new("counters").num_columns(2).show(ui, |ui| {
        ui.label("Cycles:");
        ui.label(state.cycle_count.to_string());
        ui.end_row();

        ui.label("None videos:");
        ui.label(state.none_video_count.to_string());
        ui.end_row();

        ui.label("Failed cycles:");
        ui.label(state.failed_count.to_string());
        ui.end_row();
    });
}

/// Render the log panel.
/// Returns true if "Clear" was clicked.
pub fn render_log(ui: &mut egui::Ui, state: &GuiState) -> bool {
    let mut clear_clicked = false;

    ui.add_space(8.0);
    ui.separator();
    ui.horizontal(|ui| {
        ui.label(RichText::new("Log").strong());
        if ui.small_button("Clear").clicked() {
            clear_clicked = true;
        }
    });

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in &state.log {
                ui.label(
                    RichText::new(format!("[{}] {}", entry.time, entry.message))
                        .monospace()
                        .color(level_color(entry.level)),
                );
            }
        });

    clear_clicked
}
