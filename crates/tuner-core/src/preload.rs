//! Next-channel preloading

use crate::engine::PlaybackBackend;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Remembers which channels have been warmed so each is warmed once
#[derive(Debug, Default)]
pub struct Preloader {
    warmed: HashSet<usize>,
}

impl Preloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm `index` unless that already happened.
    ///
    /// Returns true if a warm-up request was issued.
    pub fn preload(&mut self, index: usize, url: &str, backend: &dyn PlaybackBackend) -> bool {
        if self.warmed.contains(&index) {
            return false;
        }

        match Url::parse(url) {
            Ok(url) => {
                debug!(index, url = %url, "Preloading channel");
                backend.warm(&url);
            }
            Err(e) => debug!(index, url, error = %e, "Skipping preload of invalid URL"),
        }

        // Unusable URLs count as attempted
        self.warmed.insert(index);
        true
    }

    pub fn is_preloaded(&self, index: usize) -> bool {
        self.warmed.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.warmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warmed.is_empty()
    }

    /// Forget every warmed channel; only used when a new playlist replaces the old one
    pub fn clear(&mut self) {
        self.warmed.clear();
    }
}
