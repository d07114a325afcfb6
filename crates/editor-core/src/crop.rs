//! Crop rectangle geometry under pointer drags.
//!
//! # Rules
//!
//! 1. **Move** translates the rectangle and clamps it inside the frame; the
//!    size never changes.
//! 2. **Edges and corners** move only the dragged sides; the opposite side
//!    (or the diagonally opposite corner) stays put.
//! 3. **Minimum size** is checked on the candidate before any bounds
//!    clamping. A candidate below the floor is rejected and that axis keeps
//!    its snapshot value.
//! 4. **Aspect lock** derives the companion dimension from the driving one.
//!    When the result would leave the frame, the driving dimension is clamped
//!    to the boundary-derived maximum first and the companion re-derived
//!    (clamp-then-rederive), so bounds and ratio hold together.

use std::str::FromStr;

use cropcut_edit_model::crop::{AspectLock, AspectPreset, CropRect, FrameSize};
use serde::{Deserialize, Serialize};

const SIZE_EPSILON: f64 = 1e-9;

/// The part of the crop overlay being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropHandle {
    Move,
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// West or north: the far edge is anchored, the origin moves.
    Near,
    /// East or south: the origin is anchored.
    Far,
}

impl CropHandle {
    /// Which horizontal side this handle drags.
    fn horizontal(self) -> Option<Side> {
        match self {
            CropHandle::E | CropHandle::NE | CropHandle::SE => Some(Side::Far),
            CropHandle::W | CropHandle::NW | CropHandle::SW => Some(Side::Near),
            _ => None,
        }
    }

    /// Which vertical side this handle drags.
    fn vertical(self) -> Option<Side> {
        match self {
            CropHandle::S | CropHandle::SE | CropHandle::SW => Some(Side::Far),
            CropHandle::N | CropHandle::NE | CropHandle::NW => Some(Side::Near),
            _ => None,
        }
    }

    pub fn is_corner(self) -> bool {
        self.horizontal().is_some() && self.vertical().is_some()
    }
}

impl FromStr for CropHandle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(CropHandle::Move),
            "n" => Ok(CropHandle::N),
            "s" => Ok(CropHandle::S),
            "e" => Ok(CropHandle::E),
            "w" => Ok(CropHandle::W),
            "ne" => Ok(CropHandle::NE),
            "nw" => Ok(CropHandle::NW),
            "se" => Ok(CropHandle::SE),
            "sw" => Ok(CropHandle::SW),
            _ => Err(()),
        }
    }
}

/// Ratio between the on-screen preview and the source frame.
///
/// The preview is always drawn aspect-correct, so one factor covers both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    scale: f64,
}

impl DisplayScale {
    /// `display_width / source_width`; `None` when either is unusable.
    pub fn new(display_width: f64, source_width: f64) -> Option<Self> {
        let scale = display_width / source_width;
        (scale.is_finite() && scale > 0.0).then_some(Self { scale })
    }

    pub fn factor(&self) -> f64 {
        self.scale
    }

    /// Convert a display-space delta to source pixels.
    pub fn to_source(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx / self.scale, dy / self.scale)
    }
}

/// Apply a drag of `delta` source pixels on `handle` to the gesture snapshot
/// `initial`.
///
/// Never fails: invalid input returns `initial` unchanged.
pub fn resize(
    initial: CropRect,
    handle: CropHandle,
    delta: (f64, f64),
    lock: AspectLock,
    frame: FrameSize,
) -> CropRect {
    let (dx, dy) = delta;
    if !frame.is_valid() || !dx.is_finite() || !dy.is_finite() {
        return initial;
    }

    match (handle, lock.ratio()) {
        (CropHandle::Move, _) => translate(initial, dx, dy, frame),
        (_, Some(ratio)) => resize_locked(initial, handle, dx, dy, ratio, frame),
        (_, None) => resize_free(initial, handle, dx, dy, frame),
    }
}

fn translate(initial: CropRect, dx: f64, dy: f64, frame: FrameSize) -> CropRect {
    let max_x = (frame.w() - initial.width).max(0.0);
    let max_y = (frame.h() - initial.height).max(0.0);
    CropRect {
        x: (initial.x + dx).clamp(0.0, max_x),
        y: (initial.y + dy).clamp(0.0, max_y),
        ..initial
    }
}

fn resize_free(initial: CropRect, handle: CropHandle, dx: f64, dy: f64, frame: FrameSize) -> CropRect {
    let mut rect = initial;

    if let Some(side) = handle.horizontal() {
        match resize_axis(initial.x, initial.width, dx, side, frame.w(), frame.min_width()) {
            Some((x, width)) => {
                rect.x = x;
                rect.width = width;
            }
            None => tracing::trace!(dx, "crop width below minimum, keeping snapshot"),
        }
    }

    if let Some(side) = handle.vertical() {
        match resize_axis(initial.y, initial.height, dy, side, frame.h(), frame.min_height()) {
            Some((y, height)) => {
                rect.y = y;
                rect.height = height;
            }
            None => tracing::trace!(dy, "crop height below minimum, keeping snapshot"),
        }
    }

    rect
}

/// Resize one axis. Returns the new `(origin, size)`, or `None` when the
/// candidate size is below `min`.
fn resize_axis(
    origin: f64,
    size: f64,
    delta: f64,
    side: Side,
    limit: f64,
    min: f64,
) -> Option<(f64, f64)> {
    match side {
        Side::Far => {
            let candidate = size + delta;
            if candidate < min - SIZE_EPSILON {
                return None;
            }
            Some((origin, candidate.min(limit - origin)))
        }
        Side::Near => {
            let far_edge = origin + size;
            let candidate = size - delta;
            if candidate < min - SIZE_EPSILON {
                return None;
            }
            let size = candidate.min(far_edge);
            Some((far_edge - size, size))
        }
    }
}

fn resize_locked(
    initial: CropRect,
    handle: CropHandle,
    dx: f64,
    dy: f64,
    ratio: f64,
    frame: FrameSize,
) -> CropRect {
    let h_side = handle.horizontal();
    let v_side = handle.vertical();

    let width_drives = match (h_side, v_side) {
        (Some(_), None) => true,
        (None, Some(_)) => false,
        _ => dx.abs() >= dy.abs(),
    };

    let signed = |side: Option<Side>, delta: f64| match side {
        Some(Side::Near) => -delta,
        _ => delta,
    };

    let (mut width, mut height) = if width_drives {
        let width = initial.width + signed(h_side, dx);
        (width, width / ratio)
    } else {
        let height = initial.height + signed(v_side, dy);
        (height * ratio, height)
    };

    if width < frame.min_width() - SIZE_EPSILON || height < frame.min_height() - SIZE_EPSILON {
        tracing::trace!(width, height, "locked crop below minimum, keeping snapshot");
        return initial;
    }

    // Room available with the anchor edges fixed. The axis that is not
    // dragged grows from its origin.
    let max_width = match h_side {
        Some(Side::Near) => initial.right(),
        _ => frame.w() - initial.x,
    };
    let max_height = match v_side {
        Some(Side::Near) => initial.bottom(),
        _ => frame.h() - initial.y,
    };

    if width > max_width || height > max_height {
        width = width.min(max_width).min(max_height * ratio);
        height = width / ratio;
    }

    if width < frame.min_width() - SIZE_EPSILON || height < frame.min_height() - SIZE_EPSILON {
        tracing::trace!(width, height, "no room for locked crop, keeping snapshot");
        return initial;
    }

    let x = match h_side {
        Some(Side::Near) => initial.right() - width,
        _ => initial.x,
    };
    let y = match v_side {
        Some(Side::Near) => initial.bottom() - height,
        _ => initial.y,
    };

    CropRect::new(x.max(0.0), y.max(0.0), width, height)
}

/// Largest rectangle of `ratio` that fits the frame, centered.
pub fn fit_ratio(ratio: f64, frame: FrameSize) -> CropRect {
    if !frame.is_valid() || !ratio.is_finite() || ratio <= 0.0 {
        return CropRect::full_frame(frame);
    }

    let (width, height) = if ratio > frame.aspect() {
        (frame.w(), frame.w() / ratio)
    } else {
        (frame.h() * ratio, frame.h())
    };
    let width = width.clamp(frame.min_width(), frame.w());
    let height = height.clamp(frame.min_height(), frame.h());

    CropRect::new(
        (frame.w() - width) / 2.0,
        (frame.h() - height) / 2.0,
        width,
        height,
    )
}

/// Rectangle and lock produced by choosing a named preset.
pub fn apply_preset(preset: AspectPreset, frame: FrameSize) -> (CropRect, AspectLock) {
    match preset.ratio() {
        Some(ratio) => (fit_ratio(ratio, frame), AspectLock::Ratio(ratio)),
        None => (CropRect::full_frame(frame), AspectLock::None),
    }
}

/// A typed-in width. Clamped to `[min, frame width - x]`; always unlocks.
pub fn set_width(rect: CropRect, width: f64, frame: FrameSize) -> (CropRect, AspectLock) {
    if !width.is_finite() {
        return (rect, AspectLock::Custom);
    }
    let max = (frame.w() - rect.x).max(frame.min_width());
    let width = width.clamp(frame.min_width(), max);
    (CropRect { width, ..rect }, AspectLock::Custom)
}

/// A typed-in height. Clamped to `[min, frame height - y]`; always unlocks.
pub fn set_height(rect: CropRect, height: f64, frame: FrameSize) -> (CropRect, AspectLock) {
    if !height.is_finite() {
        return (rect, AspectLock::Custom);
    }
    let max = (frame.h() - rect.y).max(frame.min_height());
    let height = height.clamp(frame.min_height(), max);
    (CropRect { height, ..rect }, AspectLock::Custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcut_edit_model::crop::MIN_CROP_SIZE;

    const HD: FrameSize = FrameSize {
        width: 1920,
        height: 1080,
    };

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_handle_parsing() {
        assert_eq!("ne".parse(), Ok(CropHandle::NE));
        assert_eq!("Move".parse(), Ok(CropHandle::Move));
        assert!("center".parse::<CropHandle>().is_err());
        assert!(CropHandle::SW.is_corner());
        assert!(!CropHandle::S.is_corner());
    }

    #[test]
    fn test_display_scale() {
        let scale = DisplayScale::new(960.0, 1920.0).unwrap();
        assert_eq!(scale.to_source(10.0, -4.0), (20.0, -8.0));
        assert!(DisplayScale::new(0.0, 1920.0).is_none());
        assert!(DisplayScale::new(960.0, 0.0).is_none());
    }

    #[test]
    fn test_move_clamps_to_frame() {
        let rect = CropRect::new(100.0, 100.0, 400.0, 300.0);
        let moved = resize(rect, CropHandle::Move, (5000.0, -500.0), AspectLock::None, HD);
        assert_eq!(moved, CropRect::new(1520.0, 0.0, 400.0, 300.0));
    }

    #[test]
    fn test_east_edge_grows_and_clamps() {
        let rect = CropRect::new(1000.0, 0.0, 400.0, 300.0);
        let grown = resize(rect, CropHandle::E, (200.0, 50.0), AspectLock::None, HD);
        assert_eq!(grown, CropRect::new(1000.0, 0.0, 600.0, 300.0));

        let clamped = resize(rect, CropHandle::E, (5000.0, 0.0), AspectLock::None, HD);
        assert_eq!(clamped.width, 920.0);
        assert_eq!(clamped.right(), 1920.0);
    }

    #[test]
    fn test_west_edge_keeps_right_edge() {
        let rect = CropRect::new(300.0, 0.0, 400.0, 300.0);
        let dragged = resize(rect, CropHandle::W, (-100.0, 0.0), AspectLock::None, HD);
        assert_eq!(dragged, CropRect::new(200.0, 0.0, 500.0, 300.0));

        let clamped = resize(rect, CropHandle::W, (-1000.0, 0.0), AspectLock::None, HD);
        assert_eq!(clamped, CropRect::new(0.0, 0.0, 700.0, 300.0));
    }

    #[test]
    fn test_minimum_size_rejects_delta() {
        let rect = CropRect::new(300.0, 300.0, 100.0, 100.0);
        let shrunk = resize(rect, CropHandle::E, (-60.0, 0.0), AspectLock::None, HD);
        assert_eq!(shrunk, rect);

        let north = resize(rect, CropHandle::N, (0.0, 80.0), AspectLock::None, HD);
        assert_eq!(north, rect);

        let exact = resize(rect, CropHandle::S, (0.0, -50.0), AspectLock::None, HD);
        assert_eq!(exact.height, MIN_CROP_SIZE);
    }

    #[test]
    fn test_free_corner_axes_are_independent() {
        let rect = CropRect::new(500.0, 500.0, 200.0, 200.0);
        // Width shrinks below minimum (rejected), height grows.
        let dragged = resize(rect, CropHandle::NE, (-180.0, -100.0), AspectLock::None, HD);
        assert_eq!(dragged, CropRect::new(500.0, 400.0, 200.0, 300.0));
    }

    #[test]
    fn test_locked_east_edge_derives_height() {
        let rect = CropRect::new(0.0, 0.0, 160.0, 90.0);
        let ratio = 16.0 / 9.0;
        let dragged = resize(rect, CropHandle::E, (160.0, 0.0), AspectLock::Ratio(ratio), HD);
        assert_close(dragged.width, 320.0);
        assert_close(dragged.height, 180.0);
        assert_eq!((dragged.x, dragged.y), (0.0, 0.0));
    }

    #[test]
    fn test_locked_edge_clamps_then_rederives() {
        // Square near the bottom: growing the width would push the derived
        // height past the frame, so width is limited by the vertical room.
        let rect = CropRect::new(100.0, 880.0, 100.0, 100.0);
        let dragged = resize(rect, CropHandle::E, (500.0, 0.0), AspectLock::Ratio(1.0), HD);
        assert_close(dragged.height, 200.0);
        assert_close(dragged.width, 200.0);
        assert_close(dragged.bottom(), 1080.0);
    }

    #[test]
    fn test_locked_north_edge_derives_width() {
        let rect = CropRect::new(100.0, 500.0, 200.0, 100.0);
        let dragged = resize(rect, CropHandle::N, (0.0, -100.0), AspectLock::Ratio(2.0), HD);
        assert_close(dragged.height, 200.0);
        assert_close(dragged.width, 400.0);
        assert_close(dragged.y, 400.0);
        assert_close(dragged.x, 100.0);
    }

    #[test]
    fn test_locked_corner_uses_larger_delta() {
        let rect = CropRect::new(800.0, 400.0, 200.0, 200.0);
        let dragged = resize(rect, CropHandle::NW, (-50.0, -120.0), AspectLock::Ratio(1.0), HD);
        // dy drives: height 320, width 320, anchored at the SE corner.
        assert_close(dragged.width, 320.0);
        assert_close(dragged.height, 320.0);
        assert_close(dragged.right(), 1000.0);
        assert_close(dragged.bottom(), 600.0);
    }

    #[test]
    fn test_locked_corner_clamped_by_anchor() {
        let rect = CropRect::new(100.0, 100.0, 200.0, 200.0);
        let dragged = resize(rect, CropHandle::NW, (-400.0, -10.0), AspectLock::Ratio(1.0), HD);
        // Only 300px of room up and to the left of the SE anchor.
        assert_close(dragged.width, 300.0);
        assert_close(dragged.height, 300.0);
        assert_close(dragged.x, 0.0);
        assert_close(dragged.y, 0.0);
    }

    #[test]
    fn test_locked_minimum_rejects() {
        let rect = CropRect::new(100.0, 100.0, 100.0, 100.0);
        let dragged = resize(rect, CropHandle::SE, (-70.0, -10.0), AspectLock::Ratio(1.0), HD);
        assert_eq!(dragged, rect);
    }

    #[test]
    fn test_non_finite_delta_is_ignored() {
        let rect = CropRect::new(10.0, 10.0, 100.0, 100.0);
        assert_eq!(
            resize(rect, CropHandle::E, (f64::NAN, 0.0), AspectLock::None, HD),
            rect
        );
    }

    #[test]
    fn test_square_preset_on_hd_frame() {
        let (rect, lock) = apply_preset(AspectPreset::Square, HD);
        assert_eq!(rect, CropRect::new(420.0, 0.0, 1080.0, 1080.0));
        assert_eq!(lock, AspectLock::Ratio(1.0));
    }

    #[test]
    fn test_wide_preset_fits_width() {
        let (rect, _) = apply_preset(AspectPreset::Ultrawide, HD);
        assert_close(rect.width, 1920.0);
        assert_close(rect.height, 1920.0 * 9.0 / 21.0);
        assert_close(rect.y, (1080.0 - rect.height) / 2.0);
        assert_eq!(rect.x, 0.0);
    }

    #[test]
    fn test_original_preset_resets() {
        let (rect, lock) = apply_preset(AspectPreset::Original, HD);
        assert_eq!(rect, CropRect::full_frame(HD));
        assert_eq!(lock, AspectLock::None);
    }

    #[test]
    fn test_manual_dimensions_clamp_and_unlock() {
        let rect = CropRect::new(1500.0, 900.0, 200.0, 100.0);
        let (wide, lock) = set_width(rect, 1000.0, HD);
        assert_eq!(wide.width, 420.0);
        assert_eq!(lock, AspectLock::Custom);

        let (short, lock) = set_height(rect, 10.0, HD);
        assert_eq!(short.height, MIN_CROP_SIZE);
        assert_eq!(lock, AspectLock::Custom);
    }
}
