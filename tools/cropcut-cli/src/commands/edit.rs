//! Arguments shared by the commands that open a source or build an edit.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use cropcut_common::config::AppConfig;
use cropcut_edit_model::crop::{AspectPreset, CropRect};
use cropcut_edit_model::metadata::SourceMetadata;
use cropcut_edit_model::session::{EditSession, ExportFormat, ExportQuality};
use cropcut_edit_model::timeline::TrimInterval;
use cropcut_editor_core::Editor;
use cropcut_export::ExportRequest;
use cropcut_media::{FfprobeProber, LoadRequest, MediaLoad, MediaLoader};

/// The source file to open.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Source video file
    pub input: PathBuf,

    /// Duration in seconds measured while recording, for files whose
    /// container carries no usable duration
    #[arg(long, value_name = "SECS")]
    pub known_duration: Option<f64>,
}

impl SourceArgs {
    /// Probe the source, repairing its duration if needed.
    pub async fn load(&self, config: &AppConfig) -> anyhow::Result<MediaLoad> {
        let loader = MediaLoader::new(FfprobeProber::from_config(config));
        let request = LoadRequest::new(&self.input).with_known_duration(self.known_duration);
        loader
            .load(&request)
            .await
            .with_context(|| format!("Failed to load {}", self.input.display()))
    }
}

/// Edit parameters. Flags override the session file, which overrides the
/// configured export defaults.
#[derive(Debug, Default, Args)]
pub struct EditArgs {
    /// Start from a saved session file
    #[arg(long, value_name = "FILE")]
    pub session: Option<PathBuf>,

    /// Crop rectangle in source pixels
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_crop, conflicts_with = "aspect")]
    pub crop: Option<CropRect>,

    /// Centered crop with a fixed aspect: original, 16:9, 9:16, 1:1, 4:3, 3:4, 4:5, 21:9
    #[arg(long, value_name = "RATIO")]
    pub aspect: Option<AspectPreset>,

    /// Trim start in seconds
    #[arg(long, value_name = "SECS")]
    pub start: Option<f64>,

    /// Trim end in seconds
    #[arg(long, value_name = "SECS")]
    pub end: Option<f64>,

    /// Speed multiplier (0.25 to 4)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Output format: mp4 or gif
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Quality tier: low, medium or high
    #[arg(long)]
    pub quality: Option<ExportQuality>,
}

impl EditArgs {
    /// Build the session for `metadata`. Out-of-range values are clamped the
    /// same way interactive edits are.
    pub fn session_for(&self, metadata: &SourceMetadata, config: &AppConfig) -> anyhow::Result<EditSession> {
        let mut editor = match &self.session {
            Some(path) => {
                let saved = EditSession::load(path)?;
                Editor::with_session(metadata.clone(), &saved)
            }
            None => {
                let mut editor = Editor::new(metadata.clone());
                let format = config
                    .export
                    .format
                    .parse()
                    .context("Invalid export.format in config")?;
                let quality = config
                    .export
                    .quality
                    .parse()
                    .context("Invalid export.quality in config")?;
                editor.set_format(format);
                editor.set_quality(quality);
                editor
            }
        };

        if let Some(preset) = self.aspect {
            editor.select_aspect_preset(preset);
        }
        if let Some(rect) = self.crop {
            let fitted = editor.set_crop(rect);
            if fitted != rect {
                tracing::warn!(?rect, ?fitted, "Crop adjusted to fit the frame");
            }
        }

        if self.start.is_some() || self.end.is_some() {
            if editor.duration().is_none() {
                anyhow::bail!("--start/--end need a known duration; pass --known-duration");
            }
            let current = editor.session().trim;
            let requested = TrimInterval::new(
                self.start.unwrap_or(current.start),
                self.end.unwrap_or(current.end),
            );
            let trim = editor.set_trim(requested);
            if trim != requested {
                tracing::warn!(?requested, ?trim, "Trim adjusted to fit the source");
            }
        }

        if let Some(speed) = self.speed {
            let applied = editor.set_speed(speed);
            if applied != speed {
                tracing::warn!(requested = speed, applied, "Speed clamped");
            }
        }
        if let Some(format) = self.format {
            editor.set_format(format);
        }
        if let Some(quality) = self.quality {
            editor.set_quality(quality);
        }

        Ok(editor.session().clone())
    }
}

/// `x,y,w,h` in source pixels.
fn parse_crop(s: &str) -> Result<CropRect, String> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid crop `{s}`: {e}"))?;
    match values[..] {
        [x, y, w, h] if values.iter().all(|v| v.is_finite()) => Ok(CropRect::new(x, y, w, h)),
        _ => Err(format!("invalid crop `{s}`: expected X,Y,W,H")),
    }
}

/// The export request for `media`: `output` if given, otherwise a dated file
/// name in the configured export directory (or next to the source).
pub fn export_request(
    media: &MediaLoad,
    session: &EditSession,
    output: Option<PathBuf>,
    config: &AppConfig,
) -> ExportRequest {
    match output {
        Some(output) => ExportRequest {
            input: media.path.clone(),
            output,
            session: session.clone(),
            metadata: media.metadata.clone(),
        },
        None => {
            let dir = config
                .export
                .output_dir
                .clone()
                .or_else(|| media.path.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            ExportRequest::into_dir(media.path.clone(), &dir, session, &media.metadata)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcut_edit_model::crop::AspectLock;

    fn hd() -> SourceMetadata {
        SourceMetadata::new(10.0, 1920, 1080)
    }

    #[test]
    fn test_parse_crop() {
        assert_eq!(parse_crop("10, 20,300,400"), Ok(CropRect::new(10.0, 20.0, 300.0, 400.0)));
        assert!(parse_crop("10,20,300").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
        assert!(parse_crop("0,0,inf,100").is_err());
    }

    #[test]
    fn test_defaults_come_from_config() {
        let mut config = AppConfig::default();
        config.export.format = "gif".to_string();
        config.export.quality = "high".to_string();
        let session = EditArgs::default().session_for(&hd(), &config).unwrap();
        assert_eq!(session.format, ExportFormat::Gif);
        assert_eq!(session.quality, ExportQuality::High);
        assert_eq!(session.trim, TrimInterval::new(0.0, 10.0));
    }

    #[test]
    fn test_bad_config_default_is_reported() {
        let mut config = AppConfig::default();
        config.export.format = "avi".to_string();
        assert!(EditArgs::default().session_for(&hd(), &config).is_err());
    }

    #[test]
    fn test_flags_are_clamped_like_edits() {
        let args = EditArgs {
            aspect: Some(AspectPreset::Square),
            start: Some(9.8),
            speed: Some(10.0),
            format: Some(ExportFormat::Gif),
            ..EditArgs::default()
        };
        let session = args.session_for(&hd(), &AppConfig::default()).unwrap();
        assert_eq!(session.crop, CropRect::new(420.0, 0.0, 1080.0, 1080.0));
        assert_eq!(session.aspect_lock, AspectLock::Ratio(1.0));
        assert!((session.trim.start - 9.5).abs() < 1e-9);
        assert_eq!(session.trim.end, 10.0);
        assert_eq!(session.speed, 4.0);
        assert_eq!(session.format, ExportFormat::Gif);
    }

    #[test]
    fn test_trim_flags_need_a_duration() {
        let args = EditArgs {
            end: Some(3.0),
            ..EditArgs::default()
        };
        let unknown = SourceMetadata::new(f64::NAN, 640, 480);
        assert!(args.session_for(&unknown, &AppConfig::default()).is_err());
    }

    #[test]
    fn test_default_output_lands_next_to_source() {
        let media = MediaLoad {
            path: PathBuf::from("/videos/demo.webm"),
            metadata: hd(),
        };
        let session = EditSession::for_source(&media.metadata);
        let request = export_request(&media, &session, None, &AppConfig::default());
        assert_eq!(request.output.parent(), Some(Path::new("/videos")));

        let explicit = export_request(&media, &session, Some(PathBuf::from("out.mp4")), &AppConfig::default());
        assert_eq!(explicit.output, PathBuf::from("out.mp4"));
    }
}
