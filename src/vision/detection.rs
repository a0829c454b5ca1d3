//! Text detection adapter
//!
//! The detector itself is a black box behind [`TextDetector`]. The adapter
//! guards it against empty crops and normalizes what comes back, so a blank
//! reading is `None` rather than an empty label.

use image::{imageops, RgbImage};
use std::sync::Arc;
use tracing::trace;

use super::Rect;

/// A text detector run on a single region crop
///
/// Implementations must be pure: the same pixels always give the same text.
pub trait TextDetector: Send + Sync {
    /// Return the text found in `region`, or an empty/blank string for none
    fn predict(&self, region: &RgbImage) -> String;
}

/// Stand-in detector that bands the mean pixel intensity of the region
#[derive(Debug, Clone, Copy, Default)]
pub struct IntensityDetector;

impl IntensityDetector {
    /// Mean over every channel byte of the region
    pub fn mean_intensity(region: &RgbImage) -> f64 {
        let raw = region.as_raw();
        if raw.is_empty() {
            return 0.0;
        }
        let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
        sum as f64 / raw.len() as f64
    }
}

impl TextDetector for IntensityDetector {
    fn predict(&self, region: &RgbImage) -> String {
        let avg = Self::mean_intensity(region);
        if avg < 85.0 {
            "No text detected".to_string()
        } else if avg < 170.0 {
            "Sample Text A".to_string()
        } else {
            "Sample Text B".to_string()
        }
    }
}

/// Wraps a [`TextDetector`] and normalizes its readings
#[derive(Clone)]
pub struct DetectionAdapter {
    detector: Arc<dyn TextDetector>,
}

impl DetectionAdapter {
    /// Create an adapter around `detector`
    pub fn new(detector: Arc<dyn TextDetector>) -> Self {
        Self { detector }
    }

    /// Detect text in an already-cropped region
    ///
    /// Empty crops never reach the detector. Output is trimmed and a blank
    /// result becomes `None`.
    pub fn detect(&self, pixels: &RgbImage) -> Option<String> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return None;
        }

        let raw = self.detector.predict(pixels);
        let text = raw.trim();
        if text.is_empty() {
            trace!("Detector returned blank reading");
            return None;
        }
        Some(text.to_string())
    }

    /// Crop `rect` out of `frame` and detect text in it
    ///
    /// `rect` must come from [`super::clamp_region`] for this frame.
    pub fn detect_region(&self, frame: &RgbImage, rect: Rect) -> Option<String> {
        let crop = imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image();
        self.detect(&crop)
    }
}

impl Default for DetectionAdapter {
    fn default() -> Self {
        Self::new(Arc::new(IntensityDetector))
    }
}
