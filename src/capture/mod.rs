//! Screen capture and reference image matching.
//!
//! This module provides:
//! - Virtual desktop screenshots (`capture_screen`)
//! - Grayscale template matching (`find_best_match`)
//! - Cached reference image loading (`TemplateStore`)
//! - The `ScreenSearch` implementation used at runtime (`DesktopScreen`)

pub mod desktop;
pub mod matcher;
pub mod screen;
pub mod templates;

pub use desktop::DesktopScreen;
pub use templates::TemplateStore;
