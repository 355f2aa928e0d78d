//! Console mode: runs the automation without a window.
//!
//! Log lines already reach stdout through [`crate::log`], so only counter and
//! status changes are printed here. Enter stops the run.

use anyhow::Result;
use std::io::{self, BufRead};
use std::sync::mpsc::Receiver;
use std::thread;

use crate::automation::AutomationController;
use crate::automation::events::AutomationEvent;

/// Text printed for a non-log event, if any.
fn describe(event: &AutomationEvent) -> Option<String> {
    match event {
        AutomationEvent::Log { .. } => None,
        AutomationEvent::CycleCountChanged(n) => Some(format!("Cycles: {}", n)),
        AutomationEvent::NoneVideoCountChanged(n) => Some(format!("None videos: {}", n)),
        AutomationEvent::FailedCountChanged(n) => Some(format!("Failed cycles: {}", n)),
        AutomationEvent::StatusChanged(status) => Some(format!("Status: {}", status)),
    }
}

/// Starts a run, blocks until Enter is pressed (or stdin closes), then stops
/// it and prints a summary.
pub fn run_console(controller: AutomationController, events: Receiver<AutomationEvent>) -> Result<()> {
    // Ends once the controller and its loop thread drop their senders
    let printer = thread::spawn(move || {
        for event in events {
            if let Some(line) = describe(&event) {
                println!("    {}", line);
            }
        }
    });

    controller.start()?;
    println!("Press Enter to stop...");

    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        crate::log(&format!("Console: Failed to read stdin: {}", e));
    }

    controller.stop();
    controller.wait();

    let snapshot = controller.snapshot();
    println!(
        "Summary: {} cycles, {} completed, {} failed, {} none videos",
        snapshot.cycle_count,
        snapshot.completed_count,
        snapshot.failed_count,
        snapshot.none_video_count
    );

    drop(controller);
    if printer.join().is_err() {
        crate::log("Console: event printer panicked");
    }
    Ok(())
}
