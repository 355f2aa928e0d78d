//! GUI module for the application.
//!
//! Provides a graphical interface using egui/eframe: start/stop buttons,
//! run status, counters and a colored log. All data comes from the
//! controller's event channel.

pub mod render;
pub mod state;

use std::sync::mpsc::Receiver;
use std::time::Duration;

use eframe::egui::{self, Vec2};

use crate::automation::AutomationController;
use crate::automation::events::{AutomationEvent, LogLevel};

use state::GuiState;

/// Main GUI application struct.
pub struct GuiApp {
    controller: AutomationController,
    events: Receiver<AutomationEvent>,
    state: GuiState,
}

impl GuiApp {
    pub fn new(controller: AutomationController, events: Receiver<AutomationEvent>) -> Self {
        Self {
            controller,
            events,
            state: GuiState::default(),
        }
    }

    /// Applies pending events. Returns whether there were any.
    fn drain_events(&mut self) -> bool {
        let mut received = false;
        while let Ok(event) = self.events.try_recv() {
            self.state.apply(event);
            received = true;
        }
        received
    }

    fn handle_start(&mut self) {
        if let Err(e) = self.controller.start() {
            crate::log(&format!("GUI: Failed to start automation: {}", e));
            self.state.push_log(LogLevel::Error, e.to_string());
        }
    }

    fn handle_stop(&mut self) {
        if !self.controller.stop() {
            crate::log("GUI: Stop requested while idle");
        }
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let received = self.drain_events();

        // A stopped loop still sends its last lines while it winds down
        if state::keep_polling(received, self.controller.is_busy()) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Video Automation");
            ui.add_space(12.0);

            let (start_clicked, stop_clicked) = render::render_controls(ui, &self.state);
            if start_clicked {
                self.handle_start();
            }
            if stop_clicked {
                self.handle_stop();
            }

            render::render_progress(ui, &self.state);

            if render::render_log(ui, &self.state) {
                self.state.clear_log();
            }
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed. Closing the window stops
/// any active run.
pub fn run_gui(
    controller: AutomationController,
    events: Receiver<AutomationEvent>,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(520.0, 560.0))
            .with_min_inner_size(Vec2::new(380.0, 360.0))
            .with_title("Video Automation"),
        ..Default::default()
    };

    crate::log("GUI: Calling eframe::run_native...");

    eframe::run_native(
        "Video Automation",
        options,
        Box::new(move |_cc| Ok(Box::new(GuiApp::new(controller, events)))),
    )
}
