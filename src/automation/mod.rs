//! Video playback automation.
//!
//! This module provides:
//! - Reference image waits with timeouts and cooperative cancellation
//! - Mouse/keyboard input behind a small trait
//! - The per-video cycle state machine
//! - The background loop that repeats cycles until stopped

pub mod cancel;
pub mod config;
pub mod cycle;
pub mod detection;
pub mod events;
pub mod input;
pub mod runner;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use config::{get_config, init_config};
pub use events::create_event_channel;
pub use input::SystemInput;
pub use runner::AutomationController;
