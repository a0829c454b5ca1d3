//! In-memory registry of live sessions
//!
//! Session state machine per id: `ABSENT -> ACTIVE (start) -> ABSENT (stop)`.
//!
//! Locking discipline: the map lock is only held to insert, look up or
//! remove a handle. Frame work holds the per-session lock, which also
//! serializes frames of one session. `stop` removes the handle first and
//! then marks the session closed under its lock, so a `stream` that grabbed
//! the handle just before removal sees the closed flag and gets
//! [`StreamOutcome::SessionEnded`] instead of touching a finalized sink.
//!
//! Every run of an id records to its own part file. `stop` publishes it as
//! the session video only after the encoder finished; replaced runs are
//! closed before their successor is visible and their part file deleted.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::{FrameReport, Session, SessionArtifacts};
use crate::capture::CapturedFrame;
use crate::error::{Error, Result};
use crate::overlay::Annotator;
use crate::storage::{validate_session_id, SessionStore, StoredSession, REGIONS_FILE, TIMELINE_FILE};
use crate::video::EncoderFactory;
use crate::vision::{DetectionAdapter, Region};

/// Outcome of streaming a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Frame went through the pipeline
    Processed(FrameReport),
    /// No active session with that id (never started, or already stopped)
    SessionEnded,
}

/// Summary of a live session
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSessionInfo {
    pub id: String,
    pub regions: usize,
    pub frames: u64,
    pub timeline_events: usize,
    pub started_at: DateTime<Utc>,
}

/// Summary returned by `stop`
#[derive(Debug, Clone, Serialize)]
pub struct StopSummary {
    pub id: String,
    pub frames: u64,
    pub timeline_regions: usize,
}

type SessionHandle = Arc<Mutex<Session>>;

/// Keyed store of live sessions and the collaborators they share
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    store: Arc<SessionStore>,
    detector: DetectionAdapter,
    annotator: Arc<Annotator>,
    encoders: Arc<dyn EncoderFactory>,
    fps: u32,
    runs: AtomicU64,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<SessionStore>,
        detector: DetectionAdapter,
        annotator: Arc<Annotator>,
        encoders: Arc<dyn EncoderFactory>,
        fps: u32,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
            detector,
            annotator,
            encoders,
            fps,
            runs: AtomicU64::new(0),
        }
    }

    /// Backing store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Begin a session
    ///
    /// Starting an id that is already active replaces the old session; its
    /// video is closed and its timeline discarded.
    pub fn start(&self, id: &str, regions: Vec<Region>) -> Result<()> {
        validate_session_id(id)?;
        self.store.ensure_namespace(id)?;
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let video_path = self.store.partial_video_path(id, run)?;

        let previous = self.sessions.lock().remove(id);
        if let Some(previous) = previous {
            warn!(session_id = id, "Session restarted, discarding previous run");
            self.discard(id, &previous);
        }

        let region_count = regions.len();
        let session = Session::new(id, regions, self.encoders.clone(), video_path, self.fps);
        let raced = self
            .sessions
            .lock()
            .insert(id.to_string(), Arc::new(Mutex::new(session)));
        if let Some(raced) = raced {
            warn!(session_id = id, "Concurrent start, discarding the other run");
            self.discard(id, &raced);
        }

        info!(session_id = id, run, regions = region_count, "Session started");
        Ok(())
    }

    /// Push one frame through an active session
    pub fn stream(&self, id: &str, frame: &CapturedFrame) -> Result<StreamOutcome> {
        let handle = self.sessions.lock().get(id).cloned();
        let Some(handle) = handle else {
            return Ok(StreamOutcome::SessionEnded);
        };

        let mut session = handle.lock();
        if session.is_closed() {
            return Ok(StreamOutcome::SessionEnded);
        }

        let report = session.process_frame(frame, &self.detector, &self.annotator)?;
        Ok(StreamOutcome::Processed(report))
    }

    /// Stop a session, finalize its video and persist timeline and regions
    pub fn stop(&self, id: &str) -> Result<StopSummary> {
        let handle = self
            .sessions
            .lock()
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;

        let (artifacts, finalized, partial) = {
            let mut session = handle.lock();
            let (artifacts, finalized) = session.close();
            (artifacts, finalized, session.video_path().to_path_buf())
        };
        self.persist(id, &artifacts)?;

        if let Err(e) = finalized {
            if let Err(discard_err) = self.store.discard_partial(&partial) {
                warn!(session_id = id, error = %discard_err, "Failed to remove unfinished video");
            }
            return Err(e.into());
        }
        let has_video = self.store.publish_video(id, &partial)?;

        info!(
            session_id = id,
            frames = artifacts.frames,
            timeline_regions = artifacts.timeline.len(),
            has_video,
            "Session stopped"
        );

        Ok(StopSummary {
            id: id.to_string(),
            frames: artifacts.frames,
            timeline_regions: artifacts.timeline.len(),
        })
    }

    /// Stop every active session, logging failures
    pub fn stop_all(&self) -> usize {
        let ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        let mut stopped = 0;
        for id in ids {
            match self.stop(&id) {
                Ok(_) => stopped += 1,
                Err(e) => warn!(session_id = %id, error = %e, "Failed to stop session"),
            }
        }
        stopped
    }

    /// Remove a stored session; refused while it is active
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.is_active(id) {
            return Err(Error::Conflict(format!("session {} is active, stop it first", id)));
        }
        if self.store.delete(id)? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("session {}", id)))
        }
    }

    /// Sessions found in the store
    pub fn list(&self) -> Result<Vec<StoredSession>> {
        Ok(self.store.list()?)
    }

    /// Number of live sessions, without touching any session lock
    pub fn active_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Summaries of live sessions, sorted by id
    pub fn active_sessions(&self) -> Vec<ActiveSessionInfo> {
        let handles: Vec<SessionHandle> = self.sessions.lock().values().cloned().collect();
        let mut infos: Vec<ActiveSessionInfo> = handles
            .iter()
            .map(|handle| {
                let session = handle.lock();
                ActiveSessionInfo {
                    id: session.id().to_string(),
                    regions: session.regions().len(),
                    frames: session.frames(),
                    timeline_events: session.tracker().event_count(),
                    started_at: session.started_at(),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Close a replaced run and drop its recording
    fn discard(&self, id: &str, handle: &SessionHandle) {
        let mut session = handle.lock();
        let (_, finalized) = session.close();
        if let Err(e) = finalized {
            warn!(session_id = id, error = %e, "Failed to close replaced session video");
        }
        if let Err(e) = self.store.discard_partial(session.video_path()) {
            warn!(session_id = id, error = %e, "Failed to remove replaced session video");
        }
    }

    fn persist(&self, id: &str, artifacts: &SessionArtifacts) -> Result<()> {
        self.store.put_json(id, TIMELINE_FILE, &artifacts.timeline)?;
        self.store.put_json(id, REGIONS_FILE, &artifacts.regions)?;
        Ok(())
    }
}
