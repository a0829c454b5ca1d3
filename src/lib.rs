//! ROI Annotator - live frame annotation server
//!
//! Clients stream frames into a session; each frame is checked for text
//! inside a fixed set of regions, changes are recorded on a per-region
//! timeline and an annotated copy of the frame is appended to the
//! session's replay video.

pub mod analysis;
pub mod capture;
pub mod config;
pub mod error;
pub mod overlay;
pub mod session;
pub mod state;
pub mod storage;
pub mod video;
pub mod vision;
pub mod web_api;
