//! Application Configuration
//!
//! Server settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Session artifact storage
    pub storage: StorageConfig,
    /// Output video settings
    pub video: VideoConfig,
    /// Overlay drawing settings
    pub annotation: AnnotationConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// Directory of frontend files served at `/`
    pub static_dir: Option<PathBuf>,
    /// Allow requests from any origin
    pub cors_permissive: bool,
    /// Largest accepted request body in megabytes (frames arrive base64 encoded)
    pub max_body_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            static_dir: None,
            cors_permissive: true,
            max_body_mb: 16,
        }
    }
}

/// Where finished sessions are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root folder; each session gets a sub-folder named after its id
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
        }
    }
}

/// Output video settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frame rate written into the container
    pub fps: u32,
    /// ffmpeg executable name or path
    pub ffmpeg_path: String,
    /// File name of the video inside the session folder
    pub file_name: String,
    /// ffmpeg video codec
    pub codec: String,
    /// Output pixel format
    pub pixel_format: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            ffmpeg_path: "ffmpeg".to_string(),
            file_name: "video.mp4".to_string(),
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// Overlay drawing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// TrueType font for labels; common system fonts are probed when unset
    pub font_path: Option<PathBuf>,
    /// Label glyph height in pixels
    pub font_size: f32,
    /// Region box color (RGB)
    pub box_color: [u8; 3],
    /// Label text color (RGB)
    pub label_color: [u8; 3],
    /// Box stroke width in pixels
    pub thickness: u32,
    /// Smallest y a label may be drawn at
    pub min_label_y: i32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 16.0,
            box_color: [0, 255, 0],
            label_color: [0, 255, 0],
            thickness: 2,
            min_label_y: 2,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "roi_annotator=info,tower_http=info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Default location of `config.toml` in the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "roiannotator", "RoiAnnotator")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
