//! Session Layer
//!
//! A session is one client's stream: fixed regions, a change timeline and
//! a video sink. [`Session`] runs the per-frame pipeline; the
//! [`SessionRegistry`] owns the set of live sessions.

pub mod registry;

pub use registry::{ActiveSessionInfo, SessionRegistry, StreamOutcome};

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::analysis::{PersistedTimeline, TimelineTracker};
use crate::capture::CapturedFrame;
use crate::overlay::Annotator;
use crate::video::{EncoderFactory, SinkError, VideoSink};
use crate::vision::{clamp_region, DetectionAdapter, Region};

/// Result of pushing one frame through a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// 1-based number of this frame within the session
    pub frame_number: u64,
    /// Non-blank detections by region index
    pub detections: BTreeMap<usize, String>,
}

/// What a stopped session leaves behind to persist
#[derive(Debug, Clone)]
pub struct SessionArtifacts {
    pub timeline: PersistedTimeline,
    pub regions: Vec<Region>,
    pub frames: u64,
}

/// Live state of one session
pub struct Session {
    id: String,
    regions: Vec<Region>,
    tracker: TimelineTracker,
    sink: VideoSink,
    video_path: PathBuf,
    fps: u32,
    started_at: DateTime<Utc>,
    frames: u64,
    closed: bool,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        regions: Vec<Region>,
        encoders: Arc<dyn EncoderFactory>,
        video_path: PathBuf,
        fps: u32,
    ) -> Self {
        Self {
            id: id.into(),
            regions,
            tracker: TimelineTracker::new(),
            sink: VideoSink::new(encoders),
            video_path,
            fps,
            started_at: Utc::now(),
            frames: 0,
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn tracker(&self) -> &TimelineTracker {
        &self.tracker
    }

    /// File the video is encoded to while the session runs
    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Frames accepted into the video so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether the session has been stopped or replaced
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run detection, tracking, annotation and encoding for one frame
    ///
    /// A frame whose size differs from the first frame is rejected before
    /// any state changes.
    pub fn process_frame(
        &mut self,
        frame: &CapturedFrame,
        detector: &DetectionAdapter,
        annotator: &Annotator,
    ) -> Result<FrameReport, SinkError> {
        if self.closed {
            return Err(SinkError::Finalized);
        }

        let (width, height) = frame.dimensions();
        self.sink.ensure_open(width, height, &self.video_path, self.fps)?;
        self.sink.check_frame_size(width, height)?;

        let mut detections = BTreeMap::new();
        for (index, region) in self.regions.iter().enumerate() {
            let Some(rect) = clamp_region(region, width, height) else {
                trace!(session_id = %self.id, region = index, "Region outside frame, skipped");
                continue;
            };

            let text = detector.detect_region(&frame.image, rect);
            if self.tracker.observe(index, text.as_deref(), frame.timestamp) {
                debug!(session_id = %self.id, region = index, text = ?text, "Region text changed");
            }
            if let Some(text) = text {
                detections.insert(index, text);
            }
        }

        let annotated = annotator.annotate(&frame.image, &self.regions, &detections);
        self.sink.write(&annotated)?;
        self.frames += 1;

        Ok(FrameReport {
            frame_number: self.frames,
            detections,
        })
    }

    /// Mark closed and finalize the video
    ///
    /// Artifacts are returned even when finalizing fails so the timeline can
    /// still be persisted.
    pub fn close(&mut self) -> (SessionArtifacts, Result<(), SinkError>) {
        self.closed = true;
        let finalized = self.sink.finalize();
        let artifacts = SessionArtifacts {
            timeline: self.tracker.to_persisted(),
            regions: self.regions.clone(),
            frames: self.frames,
        };
        (artifacts, finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::memory::MemoryEncoderFactory;
    use image::{Rgb, RgbImage};

    fn session(regions: Vec<Region>, factory: Arc<MemoryEncoderFactory>) -> Session {
        Session::new("s1", regions, factory, PathBuf::from("/tmp/s1/video.mp4"), 10)
    }

    fn gray_frame(width: u32, height: u32, value: u8) -> CapturedFrame {
        CapturedFrame::new(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
    }

    #[test]
    fn test_first_frame_opens_sink_at_frame_size() {
        let factory = MemoryEncoderFactory::new();
        let mut session = session(vec![Region::new(0, 0, 10, 10, "r0")], factory.clone());

        let report = session
            .process_frame(&gray_frame(64, 48, 40), &DetectionAdapter::default(), &Annotator::default())
            .unwrap();

        assert_eq!(report.frame_number, 1);
        assert_eq!(report.detections.get(&0).map(String::as_str), Some("No text detected"));

        let recorded = factory.recorded();
        assert_eq!((recorded[0].width, recorded[0].height, recorded[0].fps), (64, 48, 10));
        assert_eq!(recorded[0].frames, 1);
    }

    #[test]
    fn test_video_gets_annotated_frame() {
        let factory = MemoryEncoderFactory::new();
        let mut session = session(vec![Region::new(10, 20, 10, 10, "r0")], factory.clone());
        let frame = gray_frame(40, 40, 200);

        session
            .process_frame(&frame, &DetectionAdapter::default(), &Annotator::default())
            .unwrap();

        let written = factory.recorded()[0].last_frame.clone().unwrap();
        assert_eq!(written.get_pixel(10, 20), &Rgb([0, 255, 0]));
        // Caller's frame is untouched
        assert_eq!(frame.image.get_pixel(10, 20), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_degenerate_region_is_skipped() {
        let factory = MemoryEncoderFactory::new();
        let regions = vec![
            Region::new(500, 500, 10, 10, "outside"),
            Region::new(0, 0, 10, 10, "inside"),
        ];
        let mut session = session(regions, factory);

        let report = session
            .process_frame(&gray_frame(32, 32, 100), &DetectionAdapter::default(), &Annotator::default())
            .unwrap();

        assert!(!report.detections.contains_key(&0));
        assert_eq!(report.detections.get(&1).map(String::as_str), Some("Sample Text A"));
        assert!(session.tracker().events(0).is_empty());
    }

    #[test]
    fn test_mismatched_frame_rejected_without_state_change() {
        let factory = MemoryEncoderFactory::new();
        let mut session = session(vec![Region::new(0, 0, 10, 10, "r0")], factory.clone());
        let detector = DetectionAdapter::default();
        let annotator = Annotator::default();

        session.process_frame(&gray_frame(64, 48, 40), &detector, &annotator).unwrap();
        let err = session
            .process_frame(&gray_frame(32, 24, 200), &detector, &annotator)
            .unwrap_err();
        assert!(matches!(err, SinkError::DimensionMismatch { .. }));

        // Bright frame was not tracked; next good frame continues normally
        assert_eq!(session.tracker().events(0).len(), 1);
        let report = session.process_frame(&gray_frame(64, 48, 40), &detector, &annotator).unwrap();
        assert_eq!(report.frame_number, 2);
        assert_eq!(factory.recorded()[0].frames, 2);
    }

    #[test]
    fn test_close_finalizes_and_blocks_frames() {
        let factory = MemoryEncoderFactory::new();
        let mut session = session(vec![Region::new(0, 0, 4, 4, "r0")], factory.clone());
        session
            .process_frame(&gray_frame(8, 8, 250), &DetectionAdapter::default(), &Annotator::default())
            .unwrap();

        let (artifacts, finalized) = session.close();
        finalized.unwrap();
        assert_eq!(artifacts.frames, 1);
        assert_eq!(artifacts.timeline["0"][0].text, "Sample Text B");
        assert_eq!(factory.recorded()[0].finish_calls, 1);

        let err = session
            .process_frame(&gray_frame(8, 8, 250), &DetectionAdapter::default(), &Annotator::default())
            .unwrap_err();
        assert!(matches!(err, SinkError::Finalized));

        // Closing again is harmless
        let (_, finalized) = session.close();
        finalized.unwrap();
        assert_eq!(factory.recorded()[0].finish_calls, 1);
    }
}
