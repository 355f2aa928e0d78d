//! In-memory screen and input doubles for tests.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::automation::config::{AutomationConfig, SearchConfig};
use crate::automation::detection::{ScreenRegion, ScreenSearch};
use crate::automation::input::{InputDevice, Key};

#[derive(Clone, Debug)]
enum Script {
    /// Visible after `misses` negative probes
    Appears { misses: usize, region: ScreenRegion },
    Fails(String),
    Panics,
}

/// Screen whose contents are scripted per reference image.
///
/// Images without a script are never on screen.
#[derive(Default)]
pub struct ScriptedScreen {
    scripts: HashMap<String, Script>,
    probes: Mutex<Vec<String>>,
}

impl ScriptedScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, image: &str, region: ScreenRegion) -> Self {
        self.with_image_after(image, 0, region)
    }

    pub fn with_image_after(mut self, image: &str, misses: usize, region: ScreenRegion) -> Self {
        self.scripts
            .insert(image.to_string(), Script::Appears { misses, region });
        self
    }

    pub fn with_error(mut self, image: &str, message: &str) -> Self {
        self.scripts
            .insert(image.to_string(), Script::Fails(message.to_string()));
        self
    }

    pub fn with_panic(mut self, image: &str) -> Self {
        self.scripts.insert(image.to_string(), Script::Panics);
        self
    }

    /// Every probe so far, in order.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn probe_count(&self, image: &str) -> usize {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == image)
            .count()
    }
}

impl ScreenSearch for ScriptedScreen {
    fn locate(&self, image: &str, _confidence: f32) -> Result<Option<ScreenRegion>> {
        let seen = {
            let mut probes = self.probes.lock().unwrap();
            let seen = probes.iter().filter(|p| p.as_str() == image).count();
            probes.push(image.to_string());
            seen
        };

        match self.scripts.get(image) {
            None => Ok(None),
            Some(Script::Appears { misses, region }) => {
                Ok((seen >= *misses).then_some(*region))
            }
            Some(Script::Fails(message)) => Err(anyhow!("{}", message)),
            Some(Script::Panics) => panic!("scripted panic while locating {}", image),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputAction {
    Click(i32, i32),
    Key(Key),
}

/// Input device that records what it was asked to do.
#[derive(Default)]
pub struct RecordingInput {
    actions: Mutex<Vec<InputAction>>,
    fail_clicks: bool,
}

impl RecordingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_clicks: true,
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<InputAction> {
        self.actions.lock().unwrap().clone()
    }
}

impl InputDevice for RecordingInput {
    fn click(&self, x: i32, y: i32) -> Result<()> {
        if self.fail_clicks {
            return Err(anyhow!("pointer device unavailable"));
        }
        self.actions.lock().unwrap().push(InputAction::Click(x, y));
        Ok(())
    }

    fn key_press(&self, key: Key) -> Result<()> {
        self.actions.lock().unwrap().push(InputAction::Key(key));
        Ok(())
    }
}

/// Same shape as the default configuration, with millisecond-scale waits.
pub fn fast_config() -> AutomationConfig {
    AutomationConfig {
        play: SearchConfig::new("play.png", 0.8, 30),
        fullscreen: SearchConfig::new("fullscreen.png", 0.8, 30),
        end_marker: SearchConfig::new("out.png", 0.8, 60),
        next_buttons: vec![
            SearchConfig::new("next1.png", 0.7, 20),
            SearchConfig::new("next2.png", 0.7, 20),
        ],
        poll_interval_ms: 5,
        initial_delay_ms: 0,
        play_settle_ms: 1,
        dismiss_settle_ms: 1,
        none_video_settle_ms: 1,
        success_pause_ms: 1,
        failure_pause_ms: 5,
        match_downscale: 1,
        console_mode: true,
    }
}
