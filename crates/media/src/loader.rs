//! Turning a file into [`SourceMetadata`].
//!
//! Duration resolution order: the container duration when usable, otherwise
//! the capturer's measured duration (if the request carries one), and in
//! either fallback case a one-time packet scan whose result supersedes the
//! capture estimate.

use std::path::{Path, PathBuf};

use cropcut_common::error::CropcutResult;
use cropcut_edit_model::metadata::SourceMetadata;

use crate::probe::MetadataSource;

/// A request to open a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub path: PathBuf,
    /// Wall-clock length measured by a capturer, for sources whose container
    /// was finalized without a duration.
    pub known_duration_secs: Option<f64>,
}

impl LoadRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            known_duration_secs: None,
        }
    }

    pub fn with_known_duration(mut self, secs: Option<f64>) -> Self {
        self.known_duration_secs = secs;
        self
    }
}

/// An opened source.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaLoad {
    pub path: PathBuf,
    pub metadata: SourceMetadata,
}

impl MediaLoad {
    /// File name used for export naming.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Opens sources through a [`MetadataSource`].
#[derive(Debug, Clone)]
pub struct MediaLoader<S> {
    source: S,
}

impl<S: MetadataSource> MediaLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Probe the file and adopt the capture duration when needed, without
    /// running the repair scan.
    pub async fn open(&self, request: &LoadRequest) -> CropcutResult<MediaLoad> {
        let probed = self.source.probe(&request.path).await?;

        let mut metadata =
            SourceMetadata::new(probed.duration_secs.unwrap_or(0.0), probed.width, probed.height)
                .with_audio(probed.has_audio);

        if let Some(known) = request.known_duration_secs {
            if metadata.adopt_capture_duration(known) {
                tracing::info!(
                    path = %request.path.display(),
                    duration_secs = known,
                    "Using capture-measured duration"
                );
            }
        }

        Ok(MediaLoad {
            path: request.path.clone(),
            metadata,
        })
    }

    /// Run the packet scan for a source whose duration is unknown or only
    /// capture-estimated. Failures degrade to `None` with a warning.
    pub async fn repair_duration(&self, path: &Path, metadata: &SourceMetadata) -> Option<f64> {
        if !metadata.awaits_duration() {
            return None;
        }

        match self.source.scan_duration(path).await {
            Ok(Some(secs)) => Some(secs),
            Ok(None) => {
                tracing::warn!(path = %path.display(), "Duration repair found no packets");
                None
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    prober = self.source.name(),
                    error = %e,
                    "Duration repair failed"
                );
                None
            }
        }
    }

    /// [`open`](Self::open) followed by the repair scan when needed.
    pub async fn load(&self, request: &LoadRequest) -> CropcutResult<MediaLoad> {
        let mut load = self.open(request).await?;

        if let Some(secs) = self.repair_duration(&load.path, &load.metadata).await {
            let previous = load.metadata.duration_secs;
            if load.metadata.apply_duration_correction(secs) {
                tracing::info!(
                    path = %load.path.display(),
                    previous_secs = previous,
                    duration_secs = secs,
                    "Repaired source duration"
                );
            }
        }

        tracing::info!(
            path = %load.path.display(),
            width = load.metadata.width,
            height = load.metadata.height,
            duration_secs = load.metadata.duration_secs,
            duration_source = ?load.metadata.duration_source,
            "Source loaded"
        );
        Ok(load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let load = MediaLoad {
            path: PathBuf::from("/videos/screen capture.webm"),
            metadata: SourceMetadata::new(3.0, 640, 480),
        };
        assert_eq!(load.file_name(), "screen capture.webm");
    }

    #[test]
    fn test_request_builder() {
        let request = LoadRequest::new("clip.webm").with_known_duration(Some(12.0));
        assert_eq!(request.path, PathBuf::from("clip.webm"));
        assert_eq!(request.known_duration_secs, Some(12.0));
    }
}
