//! Video Output Layer
//!
//! Annotated frames are appended to one video file per session. The sink
//! owns the lifecycle; encoders behind [`EncoderFactory`] do the actual
//! container work (ffmpeg in production, in-memory in tests).

pub mod ffmpeg;
pub mod sink;

#[cfg(test)]
pub(crate) mod memory;

pub use ffmpeg::FfmpegEncoderFactory;
pub use sink::VideoSink;

use image::RgbImage;
use std::path::Path;

/// Errors raised by video sinks and encoders
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A frame was written before the sink was opened
    #[error("video sink is not open")]
    NotOpen,

    /// The sink was already finalized
    #[error("video sink is already finalized")]
    Finalized,

    /// Frame size differs from the size the sink was opened with
    #[error("frame is {}x{} but video was opened at {}x{}", actual.0, actual.1, expected.0, expected.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Zero-sized frames cannot open an encoder
    #[error("cannot open video for an empty frame")]
    EmptyFrame,

    /// Underlying IO failed (spawning the encoder, writing to it)
    #[error("video IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoder reported a failure
    #[error("encoder error: {0}")]
    Encoder(String),
}

/// A running encoder accepting raw RGB frames of fixed size
pub trait VideoEncoder: Send {
    /// Append one frame
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SinkError>;

    /// Flush and close the output; called at most once
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Creates encoders once the frame size is known
pub trait EncoderFactory: Send + Sync {
    fn open(&self, path: &Path, width: u32, height: u32, fps: u32) -> Result<Box<dyn VideoEncoder>, SinkError>;
}
