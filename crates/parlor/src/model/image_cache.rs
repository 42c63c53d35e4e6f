//! Decoded images for display.

use std::collections::HashMap;

use iced::widget::image;

/// Image loading state.
#[derive(Debug, Clone)]
pub enum ImageState {
    /// Image is still loading.
    Loading,
    /// Image successfully loaded.
    Ready(image::Handle),
    /// Image failed to load.
    Failed(String),
}

/// Loaded images keyed by their display source.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, ImageState>,
}

impl ImageCache {
    /// Current state of an image, if it was ever requested.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ImageState> {
        self.entries.get(key)
    }

    /// Mark an image as loading.
    ///
    /// Returns false while a load is running or after it succeeded. Failed
    /// images are requested again.
    pub fn begin(&mut self, key: &str) -> bool {
        if matches!(
            self.entries.get(key),
            Some(ImageState::Loading | ImageState::Ready(_))
        ) {
            return false;
        }
        self.entries.insert(key.to_string(), ImageState::Loading);
        true
    }

    /// Record the result of a load.
    ///
    /// Results for keys that are no longer loading, e.g. after [`Self::clear`],
    /// are dropped.
    pub fn finish(&mut self, key: String, result: Result<image::Handle, String>) {
        let Some(entry) = self
            .entries
            .get_mut(&key)
            .filter(|state| matches!(state, ImageState::Loading))
        else {
            tracing::debug!("Dropping stale image result for {}", key);
            return;
        };
        *entry = match result {
            Ok(handle) => ImageState::Ready(handle),
            Err(e) => {
                tracing::debug!("Image {} failed to load: {}", key, e);
                ImageState::Failed(e)
            }
        };
    }

    /// Forget every image, e.g. when another topic is opened.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_only_once() {
        let mut cache = ImageCache::default();
        assert!(cache.begin("https://x/a.png"));
        assert!(!cache.begin("https://x/a.png"));
        assert!(matches!(cache.get("https://x/a.png"), Some(ImageState::Loading)));
    }

    #[test]
    fn test_failure_is_retried() {
        let mut cache = ImageCache::default();
        cache.begin("k");
        cache.finish("k".to_string(), Err("404".to_string()));
        assert!(matches!(cache.get("k"), Some(ImageState::Failed(e)) if e == "404"));

        assert!(cache.begin("k"));
        assert!(matches!(cache.get("k"), Some(ImageState::Loading)));
    }

    #[test]
    fn test_ready_is_not_reloaded() {
        let mut cache = ImageCache::default();
        cache.begin("k");
        cache.finish("k".to_string(), Ok(image::Handle::from_bytes(vec![0u8; 4])));
        assert!(!cache.begin("k"));
    }

    #[test]
    fn test_clear_drops_late_results() {
        let mut cache = ImageCache::default();
        cache.begin("k");
        cache.clear();
        assert!(cache.get("k").is_none());

        cache.finish("k".to_string(), Err("late".to_string()));
        assert!(cache.get("k").is_none());
    }
}
