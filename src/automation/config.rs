//! Configuration types for automation.
//!
//! Loads settings from config.json at startup. Provides reference image names,
//! match confidence thresholds, search timeouts, and pause lengths.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AutomationConfig> = OnceLock::new();

/// One reference image search: which image, how similar, and how long to wait.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// File name of the reference image inside the template directory
    pub image: String,
    /// Minimum match score (0.0 exclusive to 1.0 inclusive)
    pub confidence: f32,
    /// Maximum time to keep polling for the image (milliseconds)
    pub timeout_ms: u64,
}

impl SearchConfig {
    pub fn new(image: &str, confidence: f32, timeout_ms: u64) -> Self {
        Self {
            image: image.to_string(),
            confidence,
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Complete automation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Play button search (short timeout; a miss means "none video")
    pub play: SearchConfig,
    /// Fullscreen button search (medium timeout)
    pub fullscreen: SearchConfig,
    /// End-of-video marker search (long timeout, bounds the video length)
    pub end_marker: SearchConfig,
    /// "Next" button variants, tried in order
    pub next_buttons: Vec<SearchConfig>,
    /// Interval between two probes of the same search (milliseconds)
    pub poll_interval_ms: u64,
    /// Delay before the first cycle so the operator can arrange the screen (milliseconds)
    pub initial_delay_ms: u64,
    /// Pause after clicking play, before looking for fullscreen (milliseconds)
    pub play_settle_ms: u64,
    /// Pause after pressing Escape, before looking for next (milliseconds)
    pub dismiss_settle_ms: u64,
    /// Pause after detecting a none video, before looking for next (milliseconds)
    pub none_video_settle_ms: u64,
    /// Pause between a completed cycle and the next one (milliseconds)
    pub success_pause_ms: u64,
    /// Pause between a failed cycle and the retry (milliseconds)
    pub failure_pause_ms: u64,
    /// Downscale factor for the coarse template matching pass (1 = full resolution)
    pub match_downscale: u32,
    /// Run without the window, reporting progress on stdout
    pub console_mode: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            play: SearchConfig::new("play.png", 0.8, 5_000),
            fullscreen: SearchConfig::new("fullscreen.png", 0.8, 30_000),
            // One hour: longest video we expect to sit through
            end_marker: SearchConfig::new("out.png", 0.8, 3_600_000),
            next_buttons: vec![
                SearchConfig::new("next1.png", 0.7, 5_000),
                SearchConfig::new("next2.png", 0.7, 5_000),
            ],
            poll_interval_ms: 500,
            initial_delay_ms: 5_000,
            play_settle_ms: 2_000,
            dismiss_settle_ms: 2_000,
            none_video_settle_ms: 1_000,
            success_pause_ms: 2_000,
            failure_pause_ms: 5_000,
            match_downscale: 4,
            console_mode: false,
        }
    }
}

impl AutomationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let searches = [&self.play, &self.fullscreen, &self.end_marker]
            .into_iter()
            .chain(self.next_buttons.iter());
        for search in searches {
            if !(search.confidence > 0.0 && search.confidence <= 1.0) {
                bail!(
                    "confidence for {} must be in (0, 1], got {}",
                    search.image,
                    search.confidence
                );
            }
            if search.image.trim().is_empty() {
                bail!("reference image name must not be empty");
            }
        }
        if self.next_buttons.is_empty() {
            bail!("at least one next button image is required");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.match_downscale == 0 {
            bail!("match_downscale must be at least 1");
        }
        Ok(())
    }
}

/// Parses and validates a configuration document.
pub fn parse_config(contents: &str) -> Result<AutomationConfig> {
    let config: AutomationConfig =
        serde_json::from_str(contents).context("Failed to parse config JSON")?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path` or returns defaults.
pub fn load_config_from(path: &Path) -> AutomationConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if !path.exists() {
        crate::log("config.json not found. Using default config.");
        return AutomationConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                crate::log("Config loaded from config.json");
                config
            }
            Err(e) => {
                crate::log(&format!("Invalid config.json: {:#}. Using defaults.", e));
                AutomationConfig::default()
            }
        },
        Err(e) => {
            crate::log(&format!(
                "Failed to read config.json: {}. Using defaults.",
                e
            ));
            AutomationConfig::default()
        }
    }
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config_from(&crate::paths::get_config_path()));
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static AutomationConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
