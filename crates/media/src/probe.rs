//! Source metadata via ffprobe.
//!
//! `ffprobe -print_format json -show_format -show_streams` supplies the frame
//! size, audio presence, and (usually) the duration. Containers written by
//! live capture often carry no duration at all; for those a second pass
//! scans video packet timestamps and takes the furthest `pts + duration`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cropcut_common::config::AppConfig;
use cropcut_common::error::{CropcutError, CropcutResult};
use cropcut_edit_model::metadata::is_usable_duration;
use serde::Deserialize;

use crate::tool::run_tool;

/// What a probe learned about the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedMedia {
    pub width: u32,
    pub height: u32,
    /// `None` when the container reports nothing usable (missing, `N/A`,
    /// non-finite, or not positive).
    pub duration_secs: Option<f64>,
    pub has_audio: bool,
}

/// Reads metadata from a media file.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Container-level metadata.
    async fn probe(&self, path: &Path) -> CropcutResult<ProbedMedia>;

    /// Slow duration recovery for containers without a usable duration.
    async fn scan_duration(&self, path: &Path) -> CropcutResult<Option<f64>>;

    fn name(&self) -> &str;
}

/// [`MetadataSource`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.tools.ffprobe.clone(),
            Duration::from_secs(config.timeouts.probe_timeout_secs),
        )
    }
}

#[async_trait]
impl MetadataSource for FfprobeProber {
    async fn probe(&self, path: &Path) -> CropcutResult<ProbedMedia> {
        if !path.exists() {
            return Err(CropcutError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = run_tool(
            &self.ffprobe,
            with_input(
                &["-v", "error", "-print_format", "json", "-show_format", "-show_streams"],
                path,
            ),
            self.timeout,
        )
        .await?;

        let probed = parse_probe_output(&output.stdout_text())?;
        tracing::debug!(
            path = %path.display(),
            width = probed.width,
            height = probed.height,
            duration_secs = ?probed.duration_secs,
            has_audio = probed.has_audio,
            "Probed source"
        );
        Ok(probed)
    }

    async fn scan_duration(&self, path: &Path) -> CropcutResult<Option<f64>> {
        let output = run_tool(
            &self.ffprobe,
            with_input(
                &[
                    "-v",
                    "error",
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "packet=pts_time,duration_time",
                    "-of",
                    "csv=p=0",
                ],
                path,
            ),
            self.timeout,
        )
        .await?;
        Ok(parse_packet_scan(&output.stdout_text()))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

fn with_input(flags: &[&str], path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = flags.iter().map(OsString::from).collect();
    args.push(path.as_os_str().to_owned());
    args
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

fn parse_seconds(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| is_usable_duration(*secs))
}

/// Parse ffprobe's JSON report.
pub fn parse_probe_output(json: &str) -> CropcutResult<ProbedMedia> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| CropcutError::probe(format!("ffprobe JSON parse error: {e}")))?;

    let video = output
        .streams
        .iter()
        .find(|s| {
            s.codec_type.as_deref() == Some("video")
                && s.width.unwrap_or(0) > 0
                && s.height.unwrap_or(0) > 0
        })
        .ok_or_else(|| CropcutError::probe("no video stream with usable dimensions"))?;

    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_secs = output
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| parse_seconds(video.duration.as_deref()));

    Ok(ProbedMedia {
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        duration_secs,
        has_audio,
    })
}

/// Furthest `pts_time + duration_time` across `pts,duration` CSV lines.
/// Lines with an unreadable timestamp are skipped; a missing packet duration
/// counts as zero.
pub fn parse_packet_scan(csv: &str) -> Option<f64> {
    let end = csv
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().trim_end_matches(',').split(',');
            let pts = fields.next()?.trim().parse::<f64>().ok()?;
            let duration = fields
                .next()
                .and_then(|d| d.trim().parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(0.0);
            pts.is_finite().then_some(pts + duration)
        })
        .fold(f64::NEG_INFINITY, f64::max);

    is_usable_duration(end).then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEBM_WITHOUT_DURATION: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "vp9", "width": 1280, "height": 720},
            {"index": 1, "codec_type": "audio", "codec_name": "opus", "channels": 2}
        ],
        "format": {"format_name": "matroska,webm", "duration": "N/A"}
    }"#;

    #[test]
    fn test_parse_container_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 1920, "height": 1080, "duration": "9.5"}],
            "format": {"duration": "10.000000"}
        }"#;
        let probed = parse_probe_output(json).unwrap();
        assert_eq!(probed.width, 1920);
        assert_eq!(probed.height, 1080);
        assert_eq!(probed.duration_secs, Some(10.0));
        assert!(!probed.has_audio);
    }

    #[test]
    fn test_na_duration_is_unknown() {
        let probed = parse_probe_output(WEBM_WITHOUT_DURATION).unwrap();
        assert_eq!(probed.duration_secs, None);
        assert!(probed.has_audio);
    }

    #[test]
    fn test_stream_duration_is_fallback() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480, "duration": "3.25"}],
            "format": {}
        }"#;
        assert_eq!(parse_probe_output(json).unwrap().duration_secs, Some(3.25));
    }

    #[test]
    fn test_audio_only_source_is_rejected() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "4.0"}}"#;
        let err = parse_probe_output(json).unwrap_err();
        assert!(matches!(err, CropcutError::Probe { .. }));
    }

    #[test]
    fn test_garbage_is_probe_error() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(CropcutError::Probe { .. })
        ));
    }

    #[test]
    fn test_packet_scan_takes_furthest_end() {
        let csv = "0.000000,0.033000\n0.033000,0.033000\nN/A,0.033000\n7.966000,0.034000\n2.0,\n";
        let end = parse_packet_scan(csv).unwrap();
        assert!((end - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_packet_scan_without_packets() {
        assert_eq!(parse_packet_scan(""), None);
        assert_eq!(parse_packet_scan("N/A,N/A\n"), None);
        assert_eq!(parse_packet_scan("0.000000,N/A\n"), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let prober = FfprobeProber::new("ffprobe", Duration::from_secs(1));
        let err = prober
            .probe(Path::new("/nonexistent/cropcut/clip.webm"))
            .await
            .unwrap_err();
        assert!(matches!(err, CropcutError::FileNotFound { .. }));
    }
}
