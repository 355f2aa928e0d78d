//! Reference image loading.

use anyhow::{Context, Result};
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Loads reference images from a directory and keeps them in memory.
///
/// Images are converted to grayscale once, on first use.
pub struct TemplateStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<GrayImage>>>,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the grayscale reference image called `name`.
    pub fn get(&self, name: &str) -> Result<Arc<GrayImage>> {
        if let Some(template) = self.cached(name) {
            return Ok(template);
        }

        let path = self.dir.join(name);
        let template = image::open(&path)
            .with_context(|| format!("Failed to load reference image {}", path.display()))?
            .to_luma8();
        let template = Arc::new(template);

        crate::log(&format!(
            "Loaded reference image {} ({}x{})",
            name,
            template.width(),
            template.height()
        ));

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(name.to_string(), Arc::clone(&template));
        }
        Ok(template)
    }

    fn cached(&self, name: &str) -> Option<Arc<GrayImage>> {
        self.cache.lock().ok()?.get(name).cloned()
    }
}
