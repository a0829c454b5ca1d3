//! ffmpeg-backed encoder
//!
//! Spawns one ffmpeg child per session and pipes raw frames into it:
//!
//! ```text
//! ffmpeg -y -loglevel error \
//!   -f rawvideo -pix_fmt rgb24 -s 640x480 -r 10 -i pipe:0 \
//!   -an -vf pad=ceil(iw/2)*2:ceil(ih/2)*2 -c:v libx264 -pix_fmt yuv420p \
//!   -f mp4 outputs/<session>/video.mp4.<run>.part
//! ```
//!
//! - `-f rawvideo -pix_fmt rgb24` matches the byte layout of `image::RgbImage`
//! - `pad` rounds odd capture sizes up to even, required by yuv420p
//! - the output is a part file, so the container comes from the configured
//!   file name's extension instead of the path
//! - stderr is drained on its own thread into `tracing`

use image::RgbImage;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use super::{EncoderFactory, SinkError, VideoEncoder};
use crate::config::VideoConfig;

/// Launches ffmpeg encoders
#[derive(Debug, Clone)]
pub struct FfmpegEncoderFactory {
    ffmpeg_path: String,
    codec: String,
    pixel_format: String,
    container: String,
}

impl FfmpegEncoderFactory {
    pub fn new(config: &VideoConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            codec: config.codec.clone(),
            pixel_format: config.pixel_format.clone(),
            container: container_for(&config.file_name).to_string(),
        }
    }

    /// Arguments passed to ffmpeg for one output file
    pub fn build_args(&self, path: &Path, width: u32, height: u32, fps: u32) -> Vec<String> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", width, height),
            "-r".into(),
            fps.max(1).to_string(),
            "-i".into(),
            "pipe:0".into(),
            "-an".into(),
            "-vf".into(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            "-c:v".into(),
            self.codec.clone(),
            "-pix_fmt".into(),
            self.pixel_format.clone(),
            "-f".into(),
            self.container.clone(),
            path.to_string_lossy().into_owned(),
        ]
    }
}

/// ffmpeg muxer name for a video file name
fn container_for(file_name: &str) -> &str {
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some("mkv") => "matroska",
        Some("m4v") => "mp4",
        Some(ext) => ext,
        None => "mp4",
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn open(&self, path: &Path, width: u32, height: u32, fps: u32) -> Result<Box<dyn VideoEncoder>, SinkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = self.build_args(path, width, height, fps);
        debug!(exe = %self.ffmpeg_path, ?args, "Spawning ffmpeg");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stderr_thread = match child.stderr.take() {
            Some(stderr) => Some(
                thread::Builder::new()
                    .name("ffmpeg_stderr".into())
                    .spawn(move || {
                        for line in BufReader::new(stderr).lines() {
                            match line {
                                Ok(line) => warn!(target: "roi_annotator::ffmpeg", "{}", line),
                                Err(_) => break,
                            }
                        }
                    })?,
            ),
            None => None,
        };

        Ok(Box::new(FfmpegEncoder {
            child,
            stdin,
            stderr_thread,
            frame_len: width as usize * height as usize * 3,
        }))
    }
}

/// A running ffmpeg child fed through stdin
struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_thread: Option<JoinHandle<()>>,
    frame_len: usize,
}

impl VideoEncoder for FfmpegEncoder {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SinkError> {
        let raw = frame.as_raw();
        if raw.len() != self.frame_len {
            return Err(SinkError::Encoder(format!(
                "frame buffer is {} bytes, expected {}",
                raw.len(),
                self.frame_len
            )));
        }

        let stdin = self.stdin.as_mut().ok_or(SinkError::Finalized)?;
        stdin.write_all(raw)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        // Closing stdin signals end of input
        drop(self.stdin.take());

        let status = self.child.wait()?;
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }

        if status.success() {
            Ok(())
        } else {
            Err(SinkError::Encoder(format!("ffmpeg exited with {}", status)))
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Never finished: don't leave an orphaned encoder behind
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
