//! Screen search backed by real screenshots.

use anyhow::Result;
use image::imageops;

use crate::automation::detection::{ScreenRegion, ScreenSearch};
use crate::capture::matcher::find_best_match;
use crate::capture::screen::{Screenshot, capture_screen};
use crate::capture::templates::TemplateStore;

type CaptureFn = dyn Fn() -> Result<Screenshot> + Send + Sync;

/// Finds reference images on the desktop by template matching a fresh
/// screenshot on every probe.
pub struct DesktopScreen {
    templates: TemplateStore,
    downscale: u32,
    capture: Box<CaptureFn>,
}

impl DesktopScreen {
    pub fn new(templates: TemplateStore, downscale: u32) -> Self {
        Self::with_capture(templates, downscale, capture_screen)
    }

    /// Uses `capture` instead of the real desktop.
    pub fn with_capture<F>(templates: TemplateStore, downscale: u32, capture: F) -> Self
    where
        F: Fn() -> Result<Screenshot> + Send + Sync + 'static,
    {
        Self {
            templates,
            downscale,
            capture: Box::new(capture),
        }
    }
}

impl ScreenSearch for DesktopScreen {
    fn locate(&self, image: &str, confidence: f32) -> Result<Option<ScreenRegion>> {
        let template = self.templates.get(image)?;
        let shot = (self.capture)()?;
        let gray = imageops::grayscale(&shot.image);

        let Some(best) = find_best_match(&gray, &template, self.downscale) else {
            return Ok(None);
        };
        if best.score < confidence {
            return Ok(None);
        }

        Ok(Some(ScreenRegion::new(
            shot.origin.0 + best.x as i32,
            shot.origin.1 + best.y as i32,
            template.width(),
            template.height(),
        )))
    }
}
