//! Reference image detection with bounded, cancellable waits.
//!
//! The screen capability only answers "is this image on screen right now?".
//! [`find_on_screen`] turns that single-shot probe into a polling wait that
//! gives up after a timeout or as soon as the run is stopped.

use anyhow::Result;
use std::thread;
use std::time::{Duration, Instant};

use crate::automation::cancel::CancelToken;
use crate::automation::config::SearchConfig;

/// A located reference image, in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Point at the middle of the region, used as the click target.
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

/// Parameters of one search, built from configuration right before it runs.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSpec {
    pub image: String,
    pub confidence: f32,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl SearchSpec {
    pub fn from_config(search: &SearchConfig, poll_interval: Duration) -> Self {
        Self {
            image: search.image.clone(),
            confidence: search.confidence,
            timeout: search.timeout(),
            poll_interval,
        }
    }
}

/// Single-shot screen probe.
///
/// `Ok(None)` means the image is not on screen at the moment. `Err` is
/// reserved for the capability itself failing (capture error, unreadable
/// reference image, ...).
pub trait ScreenSearch: Send + Sync {
    fn locate(&self, image: &str, confidence: f32) -> Result<Option<ScreenRegion>>;
}

/// Polls `screen` until `spec.image` shows up, the timeout expires, or
/// `cancel` is triggered.
///
/// Returns `Ok(None)` on timeout and on cancellation. The cancellation flag is
/// re-checked at every poll tick, so a stop request is honored within one
/// poll interval regardless of the timeout.
pub fn find_on_screen(
    screen: &dyn ScreenSearch,
    spec: &SearchSpec,
    cancel: &CancelToken,
) -> Result<Option<ScreenRegion>> {
    let start = Instant::now();

    while start.elapsed() < spec.timeout && !cancel.is_cancelled() {
        if let Some(region) = screen.locate(&spec.image, spec.confidence)? {
            return Ok(Some(region));
        }

        let remaining = spec.timeout.saturating_sub(start.elapsed());
        thread::sleep(spec.poll_interval.min(remaining));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::ScriptedScreen;

    fn spec(image: &str, timeout_ms: u64) -> SearchSpec {
        SearchSpec {
            image: image.to_string(),
            confidence: 0.8,
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_center_of_region() {
        assert_eq!(ScreenRegion::new(100, 200, 50, 30).center(), (125, 215));
        assert_eq!(ScreenRegion::new(-10, 0, 5, 5).center(), (-8, 2));
    }

    #[test]
    fn test_spec_from_config() {
        let search = SearchConfig::new("play.png", 0.8, 5000);
        let spec = SearchSpec::from_config(&search, Duration::from_millis(500));
        assert_eq!(spec.image, "play.png");
        assert_eq!(spec.timeout, Duration::from_secs(5));
        assert_eq!(spec.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_found_immediately() {
        let region = ScreenRegion::new(10, 10, 20, 20);
        let screen = ScriptedScreen::new().with_image("play.png", region);
        let found = find_on_screen(&screen, &spec("play.png", 100), &CancelToken::new()).unwrap();
        assert_eq!(found, Some(region));
        assert_eq!(screen.probe_count("play.png"), 1);
    }

    #[test]
    fn test_found_after_several_polls() {
        let region = ScreenRegion::new(0, 0, 4, 4);
        let screen = ScriptedScreen::new().with_image_after("out.png", 3, region);
        let found = find_on_screen(&screen, &spec("out.png", 1000), &CancelToken::new()).unwrap();
        assert_eq!(found, Some(region));
        assert_eq!(screen.probe_count("out.png"), 4);
    }

    #[test]
    fn test_timeout_returns_none() {
        let screen = ScriptedScreen::new();
        let start = Instant::now();
        let found = find_on_screen(&screen, &spec("play.png", 40), &CancelToken::new()).unwrap();
        assert_eq!(found, None);
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(screen.probe_count("play.png") >= 2);
    }

    #[test]
    fn test_probe_error_propagates() {
        let screen = ScriptedScreen::new().with_error("play.png", "capture failed");
        let result = find_on_screen(&screen, &spec("play.png", 100), &CancelToken::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_cancelled_token_skips_probe() {
        let screen = ScriptedScreen::new().with_image("play.png", ScreenRegion::new(0, 0, 1, 1));
        let cancel = CancelToken::new();
        cancel.cancel();
        let found = find_on_screen(&screen, &spec("play.png", 1000), &cancel).unwrap();
        assert_eq!(found, None);
        assert_eq!(screen.probe_count("play.png"), 0);
    }

    #[test]
    fn test_cancel_during_wait_returns_within_poll_interval() {
        let screen = ScriptedScreen::new();
        let cancel = CancelToken::new();
        let stopper = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stopper.cancel();
        });

        let long_wait = SearchSpec {
            image: "out.png".to_string(),
            confidence: 0.8,
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(10),
        };
        let start = Instant::now();
        let found = find_on_screen(&screen, &long_wait, &cancel).unwrap();
        assert_eq!(found, None);
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}
