//! Lazily opened, per-session video sink
//!
//! The capture resolution is only known once the first frame arrives, so the
//! encoder is created on first use and every later frame must match it.

use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{EncoderFactory, SinkError, VideoEncoder};

/// Lifecycle of a sink
enum SinkState {
    /// No frame seen yet
    Uninitialized,
    /// Encoder running at fixed dimensions
    Open {
        width: u32,
        height: u32,
        encoder: Box<dyn VideoEncoder>,
    },
    /// Flushed and closed; accepts nothing further
    Finalized,
}

/// Incremental video output bound to one session
pub struct VideoSink {
    state: SinkState,
    factory: Arc<dyn EncoderFactory>,
    frames_written: u64,
}

impl VideoSink {
    /// Create an unopened sink that will use `factory` on first frame
    pub fn new(factory: Arc<dyn EncoderFactory>) -> Self {
        Self {
            state: SinkState::Uninitialized,
            factory,
            frames_written: 0,
        }
    }

    /// Open the encoder if it is not open yet
    ///
    /// A no-op when already open, whatever the arguments.
    pub fn ensure_open(&mut self, width: u32, height: u32, path: &Path, fps: u32) -> Result<(), SinkError> {
        match self.state {
            SinkState::Open { .. } => Ok(()),
            SinkState::Finalized => Err(SinkError::Finalized),
            SinkState::Uninitialized => {
                if width == 0 || height == 0 {
                    return Err(SinkError::EmptyFrame);
                }
                let encoder = self.factory.open(path, width, height, fps)?;
                info!(path = %path.display(), width, height, fps, "Opened video sink");
                self.state = SinkState::Open {
                    width,
                    height,
                    encoder,
                };
                Ok(())
            }
        }
    }

    /// Check whether a frame of this size would be accepted
    pub fn check_frame_size(&self, width: u32, height: u32) -> Result<(), SinkError> {
        match &self.state {
            SinkState::Uninitialized => Err(SinkError::NotOpen),
            SinkState::Finalized => Err(SinkError::Finalized),
            SinkState::Open {
                width: w,
                height: h,
                ..
            } => {
                if (*w, *h) == (width, height) {
                    Ok(())
                } else {
                    Err(SinkError::DimensionMismatch {
                        expected: (*w, *h),
                        actual: (width, height),
                    })
                }
            }
        }
    }

    /// Append one frame
    pub fn write(&mut self, frame: &RgbImage) -> Result<(), SinkError> {
        self.check_frame_size(frame.width(), frame.height())?;

        if let SinkState::Open { encoder, .. } = &mut self.state {
            encoder.write_frame(frame)?;
            self.frames_written += 1;
        }
        Ok(())
    }

    /// Flush and close the output
    ///
    /// Safe to call repeatedly and on a sink that never opened.
    pub fn finalize(&mut self) -> Result<(), SinkError> {
        match std::mem::replace(&mut self.state, SinkState::Finalized) {
            SinkState::Open { mut encoder, .. } => {
                debug!(frames = self.frames_written, "Finalizing video sink");
                encoder.finish()
            }
            SinkState::Uninitialized | SinkState::Finalized => Ok(()),
        }
    }

    /// Whether the encoder is currently open
    pub fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open { .. })
    }

    /// Whether `finalize` has run
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, SinkState::Finalized)
    }

    /// Dimensions fixed at open time
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.state {
            SinkState::Open { width, height, .. } => Some((width, height)),
            _ => None,
        }
    }

    /// Frames accepted so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
