//! Analysis Layer
//!
//! Turns per-frame detections into a sparse change log per region.

pub mod timeline;

pub use timeline::{PersistedTimeline, TimelineEvent, TimelineTracker};
