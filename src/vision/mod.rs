//! Vision Layer
//!
//! Region-of-interest geometry and per-region text detection on decoded frames.
//! - `geometry` clips client-supplied regions to the real frame bounds
//! - `detection` wraps a pluggable text detector and normalizes its output

pub mod detection;
pub mod geometry;

pub use detection::{DetectionAdapter, IntensityDetector, TextDetector};
pub use geometry::{clamp_region, Rect};

use serde::{Deserialize, Deserializer, Serialize};

/// A client-defined rectangle to run detection on
///
/// Coordinates are taken as supplied by the browser and may be negative or
/// larger than the frame. They are never mutated; every frame clamps them
/// again through [`clamp_region`].
///
/// `regions.json` holds the normalized form: fractional coordinates are
/// truncated and fields other than these five are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge in frame pixels
    #[serde(deserialize_with = "lenient_coord")]
    pub x: i64,
    /// Top edge in frame pixels
    #[serde(deserialize_with = "lenient_coord")]
    pub y: i64,
    /// Width in pixels
    #[serde(deserialize_with = "lenient_coord")]
    pub width: i64,
    /// Height in pixels
    #[serde(deserialize_with = "lenient_coord")]
    pub height: i64,
    /// Display label, defaults to "Region N" when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Region {
    /// Create a labelled region
    pub fn new(x: i64, y: i64, width: i64, height: i64, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            label: Some(label.into()),
        }
    }

    /// Label shown on overlays for the region at `index`
    pub fn display_label(&self, index: usize) -> String {
        match self.label.as_deref() {
            Some(label) => label.to_string(),
            None => format!("Region {}", index + 1),
        }
    }
}

/// Browsers send canvas coordinates as floats; truncate them like an integer cast
fn lenient_coord<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coord {
        Int(i64),
        Float(f64),
    }

    Ok(match Coord::deserialize(deserializer)? {
        Coord::Int(v) => v,
        Coord::Float(v) => v as i64,
    })
}
