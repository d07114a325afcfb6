//! Edit session → ffmpeg pipeline description.
//!
//! Compilation is pure: the same session and metadata always produce the same
//! description. Stage order is fixed:
//!
//! 1. **Trim**: `trim`/`atrim` to the interval, then reset timestamps.
//! 2. **Speed**: `setpts` for video, a chain of `atempo` stages for audio.
//!    Each `atempo` stage must stay within `[0.5, 2.0]`.
//! 3. **Crop**: whole-pixel rectangle in source coordinates.
//! 4. **Finish**: frame-rate and width reduction plus a two-pass palette
//!    for animated images; container output only adds encoder settings.

use std::fmt;
use std::path::{Path, PathBuf};

use cropcut_common::config::{AnimatedPreset, QualityPresets, VideoPreset};
use cropcut_common::error::CropcutError;
use cropcut_edit_model::crop::PixelRect;
use cropcut_edit_model::metadata::SourceMetadata;
use cropcut_edit_model::session::{EditSession, ExportFormat, ExportQuality};
use cropcut_edit_model::timeline::TrimInterval;
use serde::Serialize;

/// Allowed `atempo` factor range for a single stage.
pub const ATEMPO_MIN: f64 = 0.5;
pub const ATEMPO_MAX: f64 = 2.0;

const TIME_EPSILON: f64 = 1e-6;

/// Inconsistent compiler input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("source frame {width}x{height} is empty")]
    InvalidFrame { width: u32, height: u32 },

    #[error("trim {start:.3}s..{end:.3}s is empty")]
    EmptyTrim { start: f64, end: f64 },

    #[error("trim {start:.3}s..{end:.3}s lies outside the {duration:.3}s source")]
    TrimOutOfRange { start: f64, end: f64, duration: f64 },

    #[error("speed {speed} must be finite and positive")]
    InvalidSpeed { speed: f64 },

    #[error("crop {x},{y} {width}x{height} does not fit the source frame")]
    CropOutOfBounds { x: f64, y: f64, width: f64, height: f64 },
}

impl From<CompileError> for CropcutError {
    fn from(err: CompileError) -> Self {
        CropcutError::export(err.to_string())
    }
}

/// Position of a stage in the fixed pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Trim,
    Speed,
    Crop,
    Finish,
}

/// Filters contributed by one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStage {
    pub kind: StageKind,
    pub filters: Vec<String>,
}

/// An ordered filter chain for one stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterChain {
    pub stages: Vec<FilterStage>,
}

impl FilterChain {
    fn push(&mut self, kind: StageKind, filters: Vec<String>) {
        if !filters.is_empty() {
            self.stages.push(FilterStage { kind, filters });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind).collect()
    }

    pub fn stage(&self, kind: StageKind) -> Option<&FilterStage> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// ffmpeg filtergraph syntax; `null` when there is nothing to do.
    pub fn render(&self) -> String {
        let filters: Vec<&str> = self
            .stages
            .iter()
            .flat_map(|s| s.filters.iter().map(String::as_str))
            .collect();
        if filters.is_empty() {
            "null".to_string()
        } else {
            filters.join(",")
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Two-pass palette settings for animated-image output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteStage {
    /// First pass: build the palette from the filtered frames.
    pub generate: String,
    /// Second pass: map frames onto the palette.
    pub apply: String,
}

/// Everything the encoding engine needs to produce the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineDescription {
    pub format: ExportFormat,
    pub quality: ExportQuality,
    pub video_filters: FilterChain,
    pub audio_filters: Option<FilterChain>,
    pub palette: Option<PaletteStage>,
    pub encoder_args: Vec<String>,
    /// ffmpeg muxer name.
    pub container: String,
    pub mime_type: String,
    /// Length of the exported clip, when the source duration is known.
    pub output_duration_secs: Option<f64>,
    /// The pixel crop handed to the encoder, if any.
    pub crop: Option<PixelRect>,
}

/// Compiles sessions against a quality preset table.
#[derive(Debug, Clone, Default)]
pub struct ExportCompiler {
    presets: QualityPresets,
}

impl ExportCompiler {
    pub fn new(presets: QualityPresets) -> Self {
        Self { presets }
    }

    pub fn presets(&self) -> &QualityPresets {
        &self.presets
    }

    fn video_preset(&self, quality: ExportQuality) -> &VideoPreset {
        match quality {
            ExportQuality::Low => &self.presets.video.low,
            ExportQuality::Medium => &self.presets.video.medium,
            ExportQuality::High => &self.presets.video.high,
        }
    }

    fn animated_preset(&self, quality: ExportQuality) -> &AnimatedPreset {
        match quality {
            ExportQuality::Low => &self.presets.animated.low,
            ExportQuality::Medium => &self.presets.animated.medium,
            ExportQuality::High => &self.presets.animated.high,
        }
    }

    /// Compile `session` for `metadata`.
    pub fn compile(
        &self,
        session: &EditSession,
        metadata: &SourceMetadata,
    ) -> Result<PipelineDescription, CompileError> {
        let frame = metadata.frame();
        if !frame.is_valid() {
            return Err(CompileError::InvalidFrame {
                width: metadata.width,
                height: metadata.height,
            });
        }
        if !session.speed.is_finite() || session.speed <= 0.0 {
            return Err(CompileError::InvalidSpeed {
                speed: session.speed,
            });
        }
        let trim = checked_trim(session.trim, metadata)?;
        if !session.crop.is_valid_in(frame) {
            return Err(CompileError::CropOutOfBounds {
                x: session.crop.x,
                y: session.crop.y,
                width: session.crop.width,
                height: session.crop.height,
            });
        }

        let format = session.format;
        let with_audio = metadata.has_audio && !format.is_animated_image();

        let mut pixels = session.crop.to_pixels(frame);
        if !format.is_animated_image() {
            pixels = pixels.even();
        }
        let crop = (pixels
            != PixelRect {
                x: 0,
                y: 0,
                width: frame.width,
                height: frame.height,
            })
        .then_some(pixels);

        let mut video = FilterChain::default();
        let mut audio = FilterChain::default();

        if let Some(trim) = trim {
            video.push(
                StageKind::Trim,
                vec![
                    format!("trim=start={}:end={}", fmt_num(trim.start), fmt_num(trim.end)),
                    "setpts=PTS-STARTPTS".to_string(),
                ],
            );
            audio.push(
                StageKind::Trim,
                vec![
                    format!("atrim=start={}:end={}", fmt_num(trim.start), fmt_num(trim.end)),
                    "asetpts=PTS-STARTPTS".to_string(),
                ],
            );
        }

        if (session.speed - 1.0).abs() > f64::EPSILON {
            video.push(
                StageKind::Speed,
                vec![format!("setpts=PTS/{}", fmt_num(session.speed))],
            );
            audio.push(
                StageKind::Speed,
                tempo_stages(session.speed)
                    .into_iter()
                    .map(|factor| format!("atempo={}", fmt_num(factor)))
                    .collect(),
            );
        }

        if let Some(rect) = crop {
            video.push(
                StageKind::Crop,
                vec![format!(
                    "crop={}:{}:{}:{}",
                    rect.width, rect.height, rect.x, rect.y
                )],
            );
        }

        let (palette, encoder_args) = match format {
            ExportFormat::Gif => {
                let preset = self.animated_preset(session.quality);
                let output_width = crop.map_or(frame.width, |r| r.width);
                let mut finish = vec![format!("fps={}", preset.fps)];
                if output_width > preset.width {
                    finish.push(format!("scale={}:-2:flags=lanczos", preset.width));
                }
                video.push(StageKind::Finish, finish);

                let palette = PaletteStage {
                    generate: "palettegen=stats_mode=diff".to_string(),
                    apply: format!("paletteuse=dither={}", preset.dither),
                };
                (Some(palette), vec!["-loop".to_string(), "0".to_string()])
            }
            ExportFormat::Mp4 => (None, video_encoder_args(self.video_preset(session.quality), with_audio)),
        };

        let output_duration_secs = trim
            .map(|t| t.length())
            .or_else(|| metadata.known_duration())
            .map(|secs| secs / session.speed);

        let description = PipelineDescription {
            format,
            quality: session.quality,
            video_filters: video,
            audio_filters: with_audio.then_some(audio),
            palette,
            encoder_args,
            container: format.extension().to_string(),
            mime_type: format.mime_type().to_string(),
            output_duration_secs,
            crop,
        };

        tracing::debug!(
            format = %description.format,
            quality = %description.quality,
            video = %description.video_filters,
            audio = ?description.audio_filters.as_ref().map(FilterChain::render),
            output_duration_secs = ?description.output_duration_secs,
            "Compiled export pipeline"
        );
        Ok(description)
    }
}

/// Compile with the default preset table.
pub fn compile(session: &EditSession, metadata: &SourceMetadata) -> Result<PipelineDescription, CompileError> {
    ExportCompiler::default().compile(session, metadata)
}

/// Validate the trim against the source. `None` means the whole source: the
/// duration is unknown and the session carries the unresolved `[0, 0]` trim.
fn checked_trim(trim: TrimInterval, metadata: &SourceMetadata) -> Result<Option<TrimInterval>, CompileError> {
    let TrimInterval { start, end } = trim;
    let Some(duration) = metadata.known_duration() else {
        if start == 0.0 && end == 0.0 {
            return Ok(None);
        }
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(CompileError::EmptyTrim { start, end });
        }
        if end - start <= 0.0 {
            return Err(CompileError::EmptyTrim { start, end });
        }
        return Ok(Some(trim));
    };

    if !start.is_finite() || !end.is_finite() || end - start <= 0.0 {
        return Err(CompileError::EmptyTrim { start, end });
    }
    if start < -TIME_EPSILON || end > duration + TIME_EPSILON {
        return Err(CompileError::TrimOutOfRange {
            start,
            end,
            duration,
        });
    }
    Ok(Some(TrimInterval::new(start.max(0.0), end.min(duration))))
}

fn video_encoder_args(preset: &VideoPreset, with_audio: bool) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_string(),
        preset.codec.clone(),
        "-preset".to_string(),
        preset.speed_preset.clone(),
        "-crf".to_string(),
        preset.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ];
    if with_audio {
        args.extend([
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", preset.audio_bitrate_kbps),
        ]);
    } else {
        args.push("-an".to_string());
    }
    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args
}

/// Decompose `speed` into `atempo` factors within `[0.5, 2.0]` whose product
/// is `speed`. Speeds beyond the range use `k` stages where
/// `k = ceil(log2(speed))` (or `ceil(log2(1/speed))` when slowing down):
/// `k - 1` saturated stages followed by the remainder.
pub fn tempo_stages(speed: f64) -> Vec<f64> {
    if !speed.is_finite() || speed <= 0.0 || (speed - 1.0).abs() <= f64::EPSILON {
        return Vec::new();
    }
    if (ATEMPO_MIN..=ATEMPO_MAX).contains(&speed) {
        return vec![speed];
    }

    let (saturated, ratio) = if speed > ATEMPO_MAX {
        (ATEMPO_MAX, speed)
    } else {
        (ATEMPO_MIN, 1.0 / speed)
    };
    let k = ratio.log2().ceil().max(1.0) as usize;
    let remainder = speed / saturated.powi(k as i32 - 1);

    let mut stages = vec![saturated; k - 1];
    stages.push(remainder);
    stages
}

/// Shortest decimal form: `2`, `1.25`, `0.333333`.
fn fmt_num(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

impl PipelineDescription {
    /// Where the first gif pass writes its palette.
    pub fn palette_path(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_owned();
        name.push(".palette.png");
        PathBuf::from(name)
    }

    /// ffmpeg argument vectors, in execution order: one pass for container
    /// output, two (palette, then palette use) for animated images.
    pub fn invocations(&self, input: &Path, output: &Path) -> Vec<Vec<String>> {
        let input = input.to_string_lossy().into_owned();
        let target = output.to_string_lossy().into_owned();
        let progress = ["-progress", "pipe:1", "-nostats"].map(String::from);
        let head = |extra_inputs: &[String]| {
            let mut args = vec![
                "-y".to_string(),
                "-hide_banner".to_string(),
                "-v".to_string(),
                "error".to_string(),
                "-i".to_string(),
                input.clone(),
            ];
            for extra in extra_inputs {
                args.extend(["-i".to_string(), extra.clone()]);
            }
            args
        };

        match &self.palette {
            None => {
                let mut args = head(&[]);
                // Empty chains are left out: `null` only passes video through.
                if !self.video_filters.is_empty() {
                    args.extend(["-vf".to_string(), self.video_filters.render()]);
                }
                if let Some(audio) = self.audio_filters.as_ref().filter(|a| !a.is_empty()) {
                    args.extend(["-af".to_string(), audio.render()]);
                }
                args.extend(self.encoder_args.iter().cloned());
                args.extend(progress.clone());
                args.extend(["-f".to_string(), self.container.clone(), target]);
                vec![args]
            }
            Some(palette) => {
                let palette_file = Self::palette_path(output).to_string_lossy().into_owned();

                let mut first = head(&[]);
                first.extend([
                    "-vf".to_string(),
                    format!("{},{}", self.video_filters.render(), palette.generate),
                    "-an".to_string(),
                    "-frames:v".to_string(),
                    "1".to_string(),
                    "-update".to_string(),
                    "1".to_string(),
                ]);
                first.extend(progress.clone());
                first.push(palette_file.clone());

                let mut second = head(&[palette_file]);
                second.extend([
                    "-lavfi".to_string(),
                    format!(
                        "[0:v]{}[frames];[frames][1:v]{}",
                        self.video_filters.render(),
                        palette.apply
                    ),
                    "-an".to_string(),
                ]);
                second.extend(self.encoder_args.iter().cloned());
                second.extend(progress);
                second.extend(["-f".to_string(), self.container.clone(), target]);

                vec![first, second]
            }
        }
    }
}
