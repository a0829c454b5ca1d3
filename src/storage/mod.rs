//! Storage Layer
//!
//! Finished sessions live in one folder each under the output root:
//!
//! ```text
//! outputs/<session_id>/video.mp4
//! outputs/<session_id>/timeline.json
//! outputs/<session_id>/regions.json
//! ```
//!
//! Blobs are written only when a session stops. Reads of anything that was
//! never written return `None`.
//!
//! While a session records, ffmpeg writes to `video.mp4.<run>.part` next to
//! the final name. The part file is renamed to `video.mp4` only once the
//! encoder finished cleanly, so readers never see a half-written video.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timeline blob name
pub const TIMELINE_FILE: &str = "timeline.json";
/// Regions blob name
pub const REGIONS_FILE: &str = "regions.json";

/// Longest accepted session id
const MAX_SESSION_ID_LEN: usize = 128;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Session id cannot be used as a folder name
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Filesystem failure
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob could not be (de)serialized
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A session folder found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: String,
    pub has_video: bool,
    pub has_timeline: bool,
}

/// Filesystem-backed per-session blob store
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    video_file: String,
}

impl SessionStore {
    /// Store rooted at `root`, naming videos `video_file`
    pub fn new(root: impl Into<PathBuf>, video_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            video_file: video_file.into(),
        }
    }

    /// Root output folder
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding one session's artifacts
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        validate_session_id(session_id)?;
        Ok(self.root.join(session_id))
    }

    /// Where the session's video is (or will be) written
    pub fn video_path(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.session_dir(session_id)?.join(&self.video_file))
    }

    /// Where run `run` of a session encodes before it is published
    pub fn partial_video_path(&self, session_id: &str, run: u64) -> Result<PathBuf, StoreError> {
        Ok(self
            .session_dir(session_id)?
            .join(format!("{}.{}.part", self.video_file, run)))
    }

    /// Move a finished recording into place as the session's video
    ///
    /// Returns `false` when the run recorded nothing. The session's video
    /// then goes away too, so it always belongs to the latest stop.
    pub fn publish_video(&self, session_id: &str, partial: &Path) -> Result<bool, StoreError> {
        let target = self.video_path(session_id)?;
        match std::fs::rename(partial, &target) {
            Ok(()) => {
                info!(session_id, path = %target.display(), "Published session video");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                remove_optional(&target)?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop an unfinished recording
    pub fn discard_partial(&self, partial: &Path) -> Result<(), StoreError> {
        remove_optional(partial)?;
        debug!(path = %partial.display(), "Discarded partial video");
        Ok(())
    }

    /// Create the session folder
    pub fn ensure_namespace(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        let dir = self.session_dir(session_id)?;
        std::fs::create_dir_all(&dir)?;
        debug!(path = %dir.display(), "Session folder ready");
        Ok(dir)
    }

    /// Write blob `name` for a session
    pub fn put(&self, session_id: &str, name: &str, blob: &[u8]) -> Result<(), StoreError> {
        let dir = self.ensure_namespace(session_id)?;
        std::fs::write(dir.join(name), blob)?;
        Ok(())
    }

    /// Read blob `name`, `None` if it was never written
    pub fn get(&self, session_id: &str, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.session_dir(session_id)?.join(name);
        read_optional(&path)
    }

    /// Serialize `value` as pretty JSON into blob `name`
    pub fn put_json<T: Serialize>(&self, session_id: &str, name: &str, value: &T) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(value)?;
        self.put(session_id, name, &content)
    }

    /// Read and parse blob `name`
    pub fn get_json<T: DeserializeOwned>(&self, session_id: &str, name: &str) -> Result<Option<T>, StoreError> {
        match self.get(session_id, name)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read the finished video
    pub fn video(&self, session_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        read_optional(&self.video_path(session_id)?)
    }

    /// Whether a session folder exists
    pub fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.session_dir(session_id)?.is_dir())
    }

    /// Every session folder under the root, sorted by id
    pub fn list(&self) -> Result<Vec<StoredSession>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let dir = entry.path();
            sessions.push(StoredSession {
                has_video: dir.join(&self.video_file).is_file(),
                has_timeline: dir.join(TIMELINE_FILE).is_file(),
                id,
            });
        }

        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(sessions)
    }

    /// Remove a session folder; `false` if there was none
    pub fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        let dir = self.session_dir(session_id)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(session_id, "Deleted session artifacts");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session ids become folder names, so only allow a safe character set
pub fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id != "."
        && session_id != ".."
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}

fn remove_optional(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
