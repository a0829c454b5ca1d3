//! Frame Intake Layer
//!
//! Browsers post canvas snapshots as base64 data URLs
//! (`data:image/jpeg;base64,...`). This module turns them into RGB frames.

pub mod frame;

pub use frame::CapturedFrame;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::trace;

/// Why a posted frame could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No image payload at all
    #[error("frame payload is empty")]
    Empty,

    /// Payload is not valid base64
    #[error("frame is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Bytes are not a supported image
    #[error("frame is not a decodable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a data URL or bare base64 string into a frame
pub fn decode_frame(payload: &str) -> Result<CapturedFrame, DecodeError> {
    let encoded = strip_data_url(payload).trim();
    if encoded.is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = STANDARD.decode(encoded)?;
    decode_frame_bytes(&bytes)
}

/// Decode already-unwrapped image bytes (JPEG, PNG, ...)
pub fn decode_frame_bytes(bytes: &[u8]) -> Result<CapturedFrame, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let image = image::load_from_memory(bytes)?.to_rgb8();
    trace!(width = image.width(), height = image.height(), "Decoded frame");
    Ok(CapturedFrame::new(image))
}

/// Drop a `data:<mime>;base64,` prefix if present
fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        match payload.split_once(',') {
            Some((_, data)) => data,
            None => "",
        }
    } else {
        payload
    }
}
