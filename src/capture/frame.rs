//! Frame data structures for streamed browser frames

use chrono::{DateTime, Utc};
use image::RgbImage;

/// A decoded frame received from a client stream
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// RGB pixel data, never annotated in place
    pub image: RgbImage,
    /// Wall-clock time the frame was accepted
    pub timestamp: DateTime<Utc>,
}

impl CapturedFrame {
    /// Wrap a decoded image, stamped with the current time
    pub fn new(image: RgbImage) -> Self {
        Self::with_timestamp(image, Utc::now())
    }

    /// Wrap a decoded image with an explicit timestamp
    pub fn with_timestamp(image: RgbImage, timestamp: DateTime<Utc>) -> Self {
        Self { image, timestamp }
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
