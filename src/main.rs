//! Video Automation Tool
//!
//! Drives an on-screen video player by finding its controls with screen
//! image matching and clicking them, one video after another. Runs with an
//! egui window by default, or in the terminal with `--console`.

mod automation;
mod capture;
mod console;
mod gui;
mod paths;

use anyhow::{Result, anyhow};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use automation::{AutomationController, SystemInput, create_event_channel};
use capture::{DesktopScreen, TemplateStore};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::get_log_file())
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprint!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_log_file())
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn main() -> Result<()> {
    install_panic_hook();

    paths::ensure_directories()?;
    automation::init_config();

    let config = automation::get_config().clone();
    let console_mode = config.console_mode || std::env::args().skip(1).any(|a| a == "--console");

    let templates = TemplateStore::new(paths::get_template_dir());
    log(&format!("Reference images: {}", templates.dir().display()));

    let screen = Arc::new(DesktopScreen::new(templates, config.match_downscale));
    let (sender, receiver) = create_event_channel();
    let controller =
        AutomationController::new(screen, Arc::new(SystemInput), config, Arc::new(sender));

    if console_mode {
        log("Starting console mode...");
        console::run_console(controller, receiver)
    } else {
        log("Starting GUI application...");
        match gui::run_gui(controller, receiver) {
            Ok(()) => {
                log("GUI application exited normally");
                Ok(())
            }
            Err(e) => {
                log(&format!("GUI error: {}", e));
                Err(anyhow!("GUI error: {}", e))
            }
        }
    }
}
