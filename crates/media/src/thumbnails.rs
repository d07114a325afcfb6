//! Timeline thumbnail sampling.
//!
//! Each frame is decoded by its own short ffmpeg run seeking straight to the
//! sample time, so sampling never touches the playback cursor. A failure
//! anywhere yields an empty strip rather than an error.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cropcut_common::config::AppConfig;
use cropcut_common::error::{CropcutError, CropcutResult};
use cropcut_edit_model::metadata::SourceMetadata;

use crate::tool::run_tool;

/// Default thumbnail width in pixels.
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 160;

/// Upper bound on thumbnails per strip.
pub const MAX_THUMBNAILS: usize = 200;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub time_secs: f64,
    /// PNG-encoded image.
    pub png: Vec<u8>,
}

/// Sample times for `count` thumbnails: the midpoints of `count` equal
/// slices of the duration. Empty for an unknown duration or zero count.
/// `count` is capped at [`MAX_THUMBNAILS`].
pub fn thumbnail_times(duration_secs: f64, count: usize) -> Vec<f64> {
    if count == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Vec::new();
    }
    let count = count.min(MAX_THUMBNAILS);
    let slice = duration_secs / count as f64;
    (0..count).map(|i| (i as f64 + 0.5) * slice).collect()
}

/// Extracts thumbnails with ffmpeg.
#[derive(Debug, Clone)]
pub struct ThumbnailSampler {
    ffmpeg: PathBuf,
    timeout: Duration,
    width: u32,
}

impl ThumbnailSampler {
    pub fn new(ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
            width: DEFAULT_THUMBNAIL_WIDTH,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.tools.ffmpeg.clone(),
            Duration::from_secs(config.timeouts.thumbnail_timeout_secs),
        )
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width.max(2);
        self
    }

    /// `count` thumbnails spread over the source, or an empty list.
    pub async fn sample(&self, path: &Path, metadata: &SourceMetadata, count: usize) -> Vec<Thumbnail> {
        let Some(duration) = metadata.known_duration() else {
            tracing::warn!(path = %path.display(), "Skipping thumbnails: duration unknown");
            return Vec::new();
        };

        let times = thumbnail_times(duration, count);
        let mut thumbnails = Vec::with_capacity(times.len());
        for time_secs in times {
            match self.extract(path, time_secs).await {
                Ok(png) => thumbnails.push(Thumbnail { time_secs, png }),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        time_secs,
                        error = %e,
                        "Thumbnail extraction failed"
                    );
                    return Vec::new();
                }
            }
        }

        tracing::debug!(path = %path.display(), count = thumbnails.len(), "Sampled thumbnails");
        thumbnails
    }

    async fn extract(&self, path: &Path, time_secs: f64) -> CropcutResult<Vec<u8>> {
        let args = self.frame_args(path, time_secs);
        let output = run_tool(&self.ffmpeg, args, self.timeout).await?;
        if output.stdout.is_empty() {
            return Err(CropcutError::engine(format!(
                "ffmpeg produced no frame at {time_secs:.3}s"
            )));
        }
        Ok(output.stdout)
    }

    fn frame_args(&self, path: &Path, time_secs: f64) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-ss".into(),
            format!("{time_secs:.3}").into(),
            "-i".into(),
        ];
        args.push(path.as_os_str().to_owned());
        args.extend(
            [
                "-frames:v".to_string(),
                "1".to_string(),
                "-vf".to_string(),
                format!("scale={}:-2", self.width),
                "-f".to_string(),
                "image2pipe".to_string(),
                "-c:v".to_string(),
                "png".to_string(),
                "pipe:1".to_string(),
            ]
            .map(OsString::from),
        );
        args
    }
}
