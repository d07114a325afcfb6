//! Crop rectangle and aspect-ratio types.
//!
//! All coordinates are in source pixels: `(0, 0)` is the top-left corner of
//! the decoded frame, independent of how large the preview is drawn.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest crop width/height, in source pixels.
pub const MIN_CROP_SIZE: f64 = 50.0;

/// Tolerance used when comparing rectangle edges.
const EDGE_EPSILON: f64 = 1e-6;

/// Dimensions of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn w(&self) -> f64 {
        self.width as f64
    }

    pub fn h(&self) -> f64 {
        self.height as f64
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width / height.
    pub fn aspect(&self) -> f64 {
        self.w() / self.h().max(1.0)
    }

    /// Minimum crop width; frames narrower than `MIN_CROP_SIZE` use their own width.
    pub fn min_width(&self) -> f64 {
        MIN_CROP_SIZE.min(self.w())
    }

    /// Minimum crop height; frames shorter than `MIN_CROP_SIZE` use their own height.
    pub fn min_height(&self) -> f64 {
        MIN_CROP_SIZE.min(self.h())
    }
}

/// The retained region of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole frame.
    pub fn full_frame(frame: FrameSize) -> Self {
        Self::new(0.0, 0.0, frame.w(), frame.h())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Whether the rectangle satisfies the bounds and minimum-size invariants.
    pub fn is_valid_in(&self, frame: FrameSize) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.x >= -EDGE_EPSILON
            && self.y >= -EDGE_EPSILON
            && self.right() <= frame.w() + EDGE_EPSILON
            && self.bottom() <= frame.h() + EDGE_EPSILON
            && self.width >= frame.min_width() - EDGE_EPSILON
            && self.height >= frame.min_height() - EDGE_EPSILON
    }

    pub fn is_full_frame(&self, frame: FrameSize) -> bool {
        self.x.abs() < EDGE_EPSILON
            && self.y.abs() < EDGE_EPSILON
            && (self.width - frame.w()).abs() < EDGE_EPSILON
            && (self.height - frame.h()).abs() < EDGE_EPSILON
    }

    /// Force an arbitrary rectangle (e.g. from a session file or the command
    /// line) into the frame, shrinking before shifting.
    pub fn fitted_to(&self, frame: FrameSize) -> Self {
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };

        let width = finite_or(self.width, frame.w()).clamp(frame.min_width(), frame.w());
        let height = finite_or(self.height, frame.h()).clamp(frame.min_height(), frame.h());
        let x = finite_or(self.x, 0.0).clamp(0.0, frame.w() - width);
        let y = finite_or(self.y, 0.0).clamp(0.0, frame.h() - height);

        Self::new(x, y, width, height)
    }

    /// Round to whole pixels while staying inside the frame.
    pub fn to_pixels(&self, frame: FrameSize) -> PixelRect {
        let x = (self.x.round().max(0.0) as u32).min(frame.width.saturating_sub(1));
        let y = (self.y.round().max(0.0) as u32).min(frame.height.saturating_sub(1));
        let width = (self.width.round().max(1.0) as u32).min(frame.width - x);
        let height = (self.height.round().max(1.0) as u32).min(frame.height - y);
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// A crop rectangle in whole pixels, as handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Floor width and height to even values (chroma-subsampled encoders
    /// reject odd sizes). Never shrinks below 2.
    pub fn even(self) -> Self {
        Self {
            width: (self.width & !1).max(2),
            height: (self.height & !1).max(2),
            ..self
        }
    }
}

/// Aspect-ratio constraint applied during interactive resizing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "ratio", rename_all = "snake_case")]
pub enum AspectLock {
    /// Free resizing.
    #[default]
    None,
    /// Width / height fixed to this value.
    Ratio(f64),
    /// Free resizing after a manual dimension edit.
    Custom,
}

impl AspectLock {
    /// The locked ratio, if a usable one is active.
    pub fn ratio(&self) -> Option<f64> {
        match self {
            AspectLock::Ratio(r) if r.is_finite() && *r > 0.0 => Some(*r),
            _ => None,
        }
    }
}

/// Named aspect presets offered by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectPreset {
    /// Full frame, no lock.
    Original,
    Widescreen,
    Vertical,
    Square,
    Standard,
    Portrait,
    Social,
    Ultrawide,
}

impl AspectPreset {
    pub const ALL: [AspectPreset; 8] = [
        AspectPreset::Original,
        AspectPreset::Widescreen,
        AspectPreset::Vertical,
        AspectPreset::Square,
        AspectPreset::Standard,
        AspectPreset::Portrait,
        AspectPreset::Social,
        AspectPreset::Ultrawide,
    ];

    /// Width / height, or `None` for [`AspectPreset::Original`].
    pub fn ratio(&self) -> Option<f64> {
        match self {
            AspectPreset::Original => None,
            AspectPreset::Widescreen => Some(16.0 / 9.0),
            AspectPreset::Vertical => Some(9.0 / 16.0),
            AspectPreset::Square => Some(1.0),
            AspectPreset::Standard => Some(4.0 / 3.0),
            AspectPreset::Portrait => Some(3.0 / 4.0),
            AspectPreset::Social => Some(4.0 / 5.0),
            AspectPreset::Ultrawide => Some(21.0 / 9.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectPreset::Original => "original",
            AspectPreset::Widescreen => "16:9",
            AspectPreset::Vertical => "9:16",
            AspectPreset::Square => "1:1",
            AspectPreset::Standard => "4:3",
            AspectPreset::Portrait => "3:4",
            AspectPreset::Social => "4:5",
            AspectPreset::Ultrawide => "21:9",
        }
    }
}

impl fmt::Display for AspectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when an aspect preset label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown aspect preset `{0}` (expected original, 16:9, 9:16, 1:1, 4:3, 3:4, 4:5 or 21:9)")]
pub struct UnknownAspectPreset(pub String);

impl FromStr for AspectPreset {
    type Err = UnknownAspectPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        AspectPreset::ALL
            .into_iter()
            .find(|preset| preset.label() == needle)
            .ok_or_else(|| UnknownAspectPreset(s.to_string()))
    }
}
