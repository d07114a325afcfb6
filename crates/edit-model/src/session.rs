//! The edit session: every parameter the user controls for one clip.
//!
//! A session is created when media finishes loading and discarded on
//! "new video". It can be persisted as a JSON session file so the CLI can
//! replay an edit.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cropcut_common::error::CropcutError;
use serde::{Deserialize, Serialize};

use crate::crop::{AspectLock, CropRect};
use crate::metadata::SourceMetadata;
use crate::timeline::TrimInterval;

/// Slowest supported playback/export speed.
pub const MIN_SPEED: f64 = 0.25;

/// Fastest supported playback/export speed.
pub const MAX_SPEED: f64 = 4.0;

/// Current edit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    /// Crop rectangle in source pixels.
    pub crop: CropRect,

    /// Aspect constraint for interactive resizing.
    #[serde(default)]
    pub aspect_lock: AspectLock,

    /// Retained time range.
    pub trim: TrimInterval,

    /// Speed multiplier in `[MIN_SPEED, MAX_SPEED]`.
    pub speed: f64,

    /// Output format.
    #[serde(default)]
    pub format: ExportFormat,

    /// Output quality tier.
    #[serde(default)]
    pub quality: ExportQuality,
}

impl EditSession {
    /// Defaults for freshly loaded media: full frame, full duration, 1x.
    pub fn for_source(metadata: &SourceMetadata) -> Self {
        Self {
            crop: CropRect::full_frame(metadata.frame()),
            aspect_lock: AspectLock::None,
            trim: TrimInterval::full(metadata.duration_secs),
            speed: 1.0,
            format: ExportFormat::default(),
            quality: ExportQuality::default(),
        }
    }

    /// Set the speed, clamped to the supported range. Non-finite values are
    /// ignored. Returns the speed now in effect.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if speed.is_finite() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
        self.speed
    }

    /// Bring a session loaded from disk (or assembled from flags) back inside
    /// the invariants for `metadata`.
    pub fn fitted_to(&self, metadata: &SourceMetadata) -> Self {
        let mut fitted = self.clone();
        fitted.crop = self.crop.fitted_to(metadata.frame());
        if let Some(duration) = metadata.known_duration() {
            fitted.trim = self.trim.fitted_to(duration);
        }
        if !fitted.speed.is_finite() {
            fitted.speed = 1.0;
        }
        fitted.speed = fitted.speed.clamp(MIN_SPEED, MAX_SPEED);
        fitted
    }

    /// Load a session file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SessionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SessionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save the session as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| SessionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// H.264/AAC in an MP4 container.
    #[default]
    Mp4,
    /// Animated GIF (no audio).
    Gif,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Gif => "gif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "video/mp4",
            ExportFormat::Gif => "image/gif",
        }
    }

    pub fn is_animated_image(&self) -> bool {
        matches!(self, ExportFormat::Gif)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "video" | "container" => Ok(ExportFormat::Mp4),
            "gif" | "animated-image" => Ok(ExportFormat::Gif),
            _ => Err(SessionError::ValidationError {
                message: format!("unknown export format `{s}` (expected mp4 or gif)"),
            }),
        }
    }
}

/// Quality tier, mapped to encoder parameters by the preset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportQuality::Low => "low",
            ExportQuality::Medium => "medium",
            ExportQuality::High => "high",
        })
    }
}

impl FromStr for ExportQuality {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ExportQuality::Low),
            "medium" => Ok(ExportQuality::Medium),
            "high" => Ok(ExportQuality::High),
            _ => Err(SessionError::ValidationError {
                message: format!("unknown quality `{s}` (expected low, medium or high)"),
            }),
        }
    }
}

/// `{stem}_edited_{YYYY-MM-DD}.{ext}` for an export of `original_name`.
pub fn output_file_name(original_name: &str, format: ExportFormat, date: chrono::NaiveDate) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!(
        "{stem}_edited_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Errors that can occur when reading or writing sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid session: {message}")]
    ValidationError { message: String },
}

impl From<SessionError> for CropcutError {
    fn from(err: SessionError) -> Self {
        CropcutError::session(err.to_string())
    }
}
