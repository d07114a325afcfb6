//! Source media metadata.

use serde::{Deserialize, Serialize};

use crate::crop::FrameSize;

/// Where the current duration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// Read from the container header.
    Container,
    /// Wall-clock length measured by the capturer.
    Capture,
    /// Recovered by probing after the container reported nothing usable.
    Repaired,
    /// Not resolved yet.
    #[default]
    Unknown,
}

/// Facts about the loaded source, resolved once per load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Duration in seconds; `0.0` while unresolved.
    pub duration_secs: f64,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Whether the source carries an audio stream.
    #[serde(default = "default_has_audio")]
    pub has_audio: bool,

    #[serde(default)]
    pub duration_source: DurationSource,
}

fn default_has_audio() -> bool {
    true
}

impl SourceMetadata {
    /// Metadata with a container-reported duration. Invalid durations are
    /// stored as `0.0` / [`DurationSource::Unknown`].
    pub fn new(duration_secs: f64, width: u32, height: u32) -> Self {
        let (duration_secs, duration_source) = if is_usable_duration(duration_secs) {
            (duration_secs, DurationSource::Container)
        } else {
            (0.0, DurationSource::Unknown)
        };
        Self {
            duration_secs,
            width,
            height,
            has_audio: true,
            duration_source,
        }
    }

    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    pub fn frame(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// The duration, if it is finite and positive.
    pub fn known_duration(&self) -> Option<f64> {
        is_usable_duration(self.duration_secs).then_some(self.duration_secs)
    }

    /// Whether a late duration correction would still be accepted.
    pub fn awaits_duration(&self) -> bool {
        matches!(
            self.duration_source,
            DurationSource::Unknown | DurationSource::Capture
        )
    }

    /// Use a capturer-measured duration while the container has none.
    /// Returns `true` if it was adopted.
    pub fn adopt_capture_duration(&mut self, secs: f64) -> bool {
        if self.duration_source != DurationSource::Unknown || !is_usable_duration(secs) {
            return false;
        }
        self.duration_secs = secs;
        self.duration_source = DurationSource::Capture;
        true
    }

    /// Apply the one-time correction produced by duration repair.
    ///
    /// Accepted only while the duration is unknown or capture-estimated, and
    /// only once; returns `true` if it was applied.
    pub fn apply_duration_correction(&mut self, secs: f64) -> bool {
        if !self.awaits_duration() || !is_usable_duration(secs) {
            return false;
        }
        self.duration_secs = secs;
        self.duration_source = DurationSource::Repaired;
        true
    }
}

/// Finite and strictly positive.
pub fn is_usable_duration(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_duration_is_unknown() {
        for bad in [0.0, -3.0, f64::INFINITY, f64::NAN] {
            let meta = SourceMetadata::new(bad, 640, 480);
            assert_eq!(meta.duration_secs, 0.0);
            assert_eq!(meta.known_duration(), None);
            assert_eq!(meta.duration_source, DurationSource::Unknown);
        }
    }

    #[test]
    fn test_correction_applies_once() {
        let mut meta = SourceMetadata::new(f64::INFINITY, 640, 480);
        assert!(meta.apply_duration_correction(12.5));
        assert_eq!(meta.known_duration(), Some(12.5));
        assert!(!meta.apply_duration_correction(13.0));
        assert_eq!(meta.duration_secs, 12.5);
    }

    #[test]
    fn test_container_duration_is_final() {
        let mut meta = SourceMetadata::new(10.0, 640, 480);
        assert!(!meta.awaits_duration());
        assert!(!meta.adopt_capture_duration(9.0));
        assert!(!meta.apply_duration_correction(11.0));
        assert_eq!(meta.duration_secs, 10.0);
    }

    #[test]
    fn test_capture_duration_superseded_by_repair() {
        let mut meta = SourceMetadata::new(0.0, 1280, 720);
        assert!(meta.adopt_capture_duration(7.9));
        assert_eq!(meta.duration_source, DurationSource::Capture);
        assert!(meta.awaits_duration());
        assert!(meta.apply_duration_correction(8.04));
        assert_eq!(meta.duration_source, DurationSource::Repaired);
    }

    #[test]
    fn test_invalid_correction_rejected() {
        let mut meta = SourceMetadata::new(0.0, 640, 480);
        assert!(!meta.apply_duration_correction(f64::NAN));
        assert!(meta.awaits_duration());
    }

    #[test]
    fn test_legacy_json_defaults() {
        let meta: SourceMetadata =
            serde_json::from_str(r#"{"duration_secs":4.0,"width":320,"height":240}"#).unwrap();
        assert!(meta.has_audio);
        assert_eq!(meta.duration_source, DurationSource::Unknown);
    }
}
