//! In-memory encoder used by tests

use image::RgbImage;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{EncoderFactory, SinkError, VideoEncoder};

/// What one encoder saw
#[derive(Debug, Clone, Default)]
pub struct RecordedVideo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames: usize,
    pub last_frame: Option<RgbImage>,
    pub finish_calls: usize,
}

/// Factory recording every encoder it hands out
#[derive(Default)]
pub struct MemoryEncoderFactory {
    videos: Arc<Mutex<Vec<RecordedVideo>>>,
    fail_open: bool,
    write_files: bool,
}

impl MemoryEncoderFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Factory whose `open` always fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_open: true,
            ..Self::default()
        })
    }

    /// Factory whose encoders also write raw frames to their output path
    pub fn writing_files() -> Arc<Self> {
        Arc::new(Self {
            write_files: true,
            ..Self::default()
        })
    }

    pub fn opened(&self) -> usize {
        self.videos.lock().len()
    }

    pub fn recorded(&self) -> Vec<RecordedVideo> {
        self.videos.lock().clone()
    }
}

impl EncoderFactory for MemoryEncoderFactory {
    fn open(&self, path: &Path, width: u32, height: u32, fps: u32) -> Result<Box<dyn VideoEncoder>, SinkError> {
        if self.fail_open {
            return Err(SinkError::Encoder("encoder unavailable".to_string()));
        }

        let file = if self.write_files { Some(File::create(path)?) } else { None };

        let mut videos = self.videos.lock();
        videos.push(RecordedVideo {
            path: path.to_path_buf(),
            width,
            height,
            fps,
            ..RecordedVideo::default()
        });

        Ok(Box::new(MemoryEncoder {
            videos: self.videos.clone(),
            index: videos.len() - 1,
            file,
        }))
    }
}

struct MemoryEncoder {
    videos: Arc<Mutex<Vec<RecordedVideo>>>,
    index: usize,
    file: Option<File>,
}

impl VideoEncoder for MemoryEncoder {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SinkError> {
        if let Some(file) = &mut self.file {
            file.write_all(frame.as_raw())?;
        }

        let mut videos = self.videos.lock();
        let video = &mut videos[self.index];
        video.frames += 1;
        video.last_frame = Some(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        self.videos.lock()[self.index].finish_calls += 1;
        Ok(())
    }
}
