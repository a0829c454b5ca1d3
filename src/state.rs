//! Application state
//!
//! Holds the shared components handed to every request handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::overlay::Annotator;
use crate::session::SessionRegistry;
use crate::storage::SessionStore;
use crate::video::FfmpegEncoderFactory;
use crate::vision::DetectionAdapter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration
    pub config: Arc<AppConfig>,
    /// Live sessions and their store
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    /// Assemble state from explicit parts
    pub fn new(config: AppConfig, registry: SessionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
        }
    }

    /// Production wiring: filesystem store, ffmpeg encoder, intensity detector
    pub fn from_config(config: AppConfig) -> Self {
        let store = Arc::new(SessionStore::new(
            config.storage.output_dir.clone(),
            config.video.file_name.clone(),
        ));
        let annotator = Arc::new(Annotator::from_config(&config.annotation));
        let encoders = Arc::new(FfmpegEncoderFactory::new(&config.video));

        let registry = SessionRegistry::new(
            store,
            DetectionAdapter::default(),
            annotator,
            encoders,
            config.video.fps,
        );

        Self::new(config, registry)
    }
}
