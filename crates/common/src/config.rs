//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Locations of the external media tools.
    pub tools: ToolPaths,

    /// Default export settings.
    pub export: ExportDefaults,

    /// Encoder parameters per output format and quality tier.
    pub presets: QualityPresets,

    /// Timeouts for long-running external operations.
    pub timeouts: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Paths (or bare names resolved through `PATH`) of ffmpeg and ffprobe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output format name (`mp4` or `gif`).
    pub format: String,

    /// Quality tier name (`low`, `medium`, `high`).
    pub quality: String,

    /// Directory exports are written to when no output path is given.
    pub output_dir: Option<PathBuf>,
}

/// Timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Metadata probing and duration repair.
    pub probe_timeout_secs: u64,

    /// Extraction of a single thumbnail frame.
    pub thumbnail_timeout_secs: u64,

    /// Whole export run. `None` waits indefinitely.
    pub export_timeout_secs: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cropcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// One entry per quality tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable<T> {
    pub low: T,
    pub medium: T,
    pub high: T,
}

/// Encoder parameters for container (video) output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPreset {
    /// ffmpeg video encoder name.
    pub codec: String,
    /// Encoder speed/compression trade-off (`-preset`).
    pub speed_preset: String,
    /// Constant rate factor; lower is better quality.
    pub crf: u32,
    /// AAC bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

/// Frame rate / size / dither settings for animated-image output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatedPreset {
    pub fps: u32,
    /// Target width in pixels; frames narrower than this are not scaled.
    pub width: u32,
    /// `paletteuse` dither method, e.g. `sierra2_4a` or `bayer:bayer_scale=5`.
    pub dither: String,
}

/// The quality lookup table used by the export compiler.
///
/// This is pure configuration: tiers can be retuned here without touching
/// stage ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPresets {
    pub video: TierTable<VideoPreset>,
    pub animated: TierTable<AnimatedPreset>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            quality: "medium".to_string(),
            output_dir: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 30,
            thumbnail_timeout_secs: 10,
            export_timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Default for QualityPresets {
    fn default() -> Self {
        let video = |speed_preset: &str, crf: u32, audio_bitrate_kbps: u32| VideoPreset {
            codec: "libx264".to_string(),
            speed_preset: speed_preset.to_string(),
            crf,
            audio_bitrate_kbps,
        };
        let animated = |fps: u32, width: u32, dither: &str| AnimatedPreset {
            fps,
            width,
            dither: dither.to_string(),
        };

        Self {
            video: TierTable {
                low: video("veryfast", 28, 96),
                medium: video("medium", 23, 128),
                high: video("slow", 18, 192),
            },
            animated: TierTable {
                low: animated(10, 320, "bayer:bayer_scale=5"),
                medium: animated(15, 480, "sierra2_4a"),
                high: animated(20, 640, "floyd_steinberg"),
            },
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cropcut").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_presets_scale_with_tier() {
        let presets = QualityPresets::default();
        assert!(presets.video.low.crf > presets.video.medium.crf);
        assert!(presets.video.medium.crf > presets.video.high.crf);
        assert!(presets.animated.low.fps < presets.animated.high.fps);
        assert!(presets.animated.low.width < presets.animated.high.width);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "tools": { "ffmpeg": "/opt/ffmpeg/bin/ffmpeg" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.export.quality, "medium");
        assert_eq!(config.timeouts.probe_timeout_secs, 30);
        assert_eq!(config.presets, QualityPresets::default());
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let mut config = AppConfig::default();
        config.presets.animated.medium.fps = 12;
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.presets.animated.medium.fps, 12);
    }
}
