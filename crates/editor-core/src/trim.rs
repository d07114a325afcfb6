//! Trim handles and playhead on the timeline track.
//!
//! Pointer positions map linearly onto the source duration across the
//! visible track width. Dragging never reports an error: positions outside
//! the track, or a degenerate track, are clamped or ignored.

use cropcut_edit_model::timeline::{TrimInterval, MIN_TRIM_DURATION};
use serde::{Deserialize, Serialize};

/// The timeline element being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimHandle {
    Start,
    End,
    Playhead,
}

/// Horizontal extent of the track, in the same units as pointer positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackRect {
    pub left: f64,
    pub width: f64,
}

impl TrackRect {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    fn is_usable(&self) -> bool {
        self.left.is_finite() && self.width.is_finite() && self.width > 0.0
    }
}

/// Trim bounds plus playhead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineState {
    pub trim: TrimInterval,
    /// Playhead position in seconds.
    pub cursor: f64,
    pub duration: f64,
}

/// Time under `pointer_x`, or `None` when the track or duration is unusable.
///
/// Also serves hover previews: it only reads.
pub fn time_at(pointer_x: f64, track: TrackRect, duration: f64) -> Option<f64> {
    if !track.is_usable() || !pointer_x.is_finite() || !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    let fraction = ((pointer_x - track.left) / track.width).clamp(0.0, 1.0);
    Some(fraction * duration)
}

/// Apply a drag of `handle` to `pointer_x`.
///
/// Start/end drags leave the cursor alone; reconciling it with the new bounds
/// is the playback owner's job. Invalid input returns `state` unchanged.
pub fn on_drag(handle: TrimHandle, pointer_x: f64, track: TrackRect, state: TimelineState) -> TimelineState {
    let Some(time) = time_at(pointer_x, track, state.duration) else {
        tracing::trace!(?handle, pointer_x, "ignoring trim drag on unusable track");
        return state;
    };

    let TimelineState {
        trim, duration, ..
    } = state;

    match handle {
        TrimHandle::Start => {
            if duration < MIN_TRIM_DURATION {
                return state;
            }
            let upper = (trim.end - MIN_TRIM_DURATION).max(0.0);
            TimelineState {
                trim: TrimInterval::new(time.clamp(0.0, upper), trim.end),
                ..state
            }
        }
        TrimHandle::End => {
            if duration < MIN_TRIM_DURATION {
                return state;
            }
            let lower = (trim.start + MIN_TRIM_DURATION).min(duration);
            TimelineState {
                trim: TrimInterval::new(trim.start, time.clamp(lower, duration)),
                ..state
            }
        }
        TrimHandle::Playhead => TimelineState {
            cursor: trim.clamp_time(time),
            ..state
        },
    }
}

/// A click on the track seeks; it never moves the trim handles.
pub fn on_track_click(pointer_x: f64, track: TrackRect, duration: f64) -> Option<f64> {
    time_at(pointer_x, track, duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(start: f64, end: f64, cursor: f64, duration: f64) -> TimelineState {
        TimelineState {
            trim: TrimInterval::new(start, end),
            cursor,
            duration,
        }
    }

    const TRACK: TrackRect = TrackRect {
        left: 100.0,
        width: 1000.0,
    };

    #[test]
    fn test_time_mapping_is_linear_and_clamped() {
        assert_eq!(time_at(600.0, TRACK, 10.0), Some(5.0));
        assert_eq!(time_at(0.0, TRACK, 10.0), Some(0.0));
        assert_eq!(time_at(5000.0, TRACK, 10.0), Some(10.0));
    }

    #[test]
    fn test_degenerate_track_is_noop() {
        let s = state(1.0, 4.0, 2.0, 10.0);
        let zero = TrackRect::new(0.0, 0.0);
        assert_eq!(on_drag(TrimHandle::Start, 50.0, zero, s), s);
        assert_eq!(on_track_click(50.0, zero, 10.0), None);
        assert_eq!(time_at(50.0, TRACK, 0.0), None);
        assert_eq!(time_at(f64::NAN, TRACK, 10.0), None);
    }

    #[test]
    fn test_start_drag_past_end_clamps() {
        // Pointer at 3.0s with end at 2.8s.
        let s = state(1.0, 2.8, 2.0, 10.0);
        let next = on_drag(TrimHandle::Start, 400.0, TRACK, s);
        assert!((next.trim.start - 2.3).abs() < 1e-9);
        assert_eq!(next.trim.end, 2.8);
    }

    #[test]
    fn test_end_drag_respects_minimum_and_duration() {
        let s = state(4.0, 8.0, 5.0, 10.0);
        let before_start = on_drag(TrimHandle::End, 200.0, TRACK, s);
        assert_eq!(before_start.trim, TrimInterval::new(4.0, 4.5));

        let past_track = on_drag(TrimHandle::End, 2000.0, TRACK, s);
        assert_eq!(past_track.trim.end, 10.0);
        assert_eq!(past_track.trim.start, 4.0);
    }

    #[test]
    fn test_trim_drags_leave_cursor() {
        let s = state(0.0, 10.0, 9.0, 10.0);
        let next = on_drag(TrimHandle::End, 600.0, TRACK, s);
        assert_eq!(next.trim.end, 5.0);
        assert_eq!(next.cursor, 9.0);
    }

    #[test]
    fn test_playhead_stays_in_trim() {
        let s = state(2.0, 6.0, 3.0, 10.0);
        assert_eq!(on_drag(TrimHandle::Playhead, 150.0, TRACK, s).cursor, 2.0);
        assert_eq!(on_drag(TrimHandle::Playhead, 500.0, TRACK, s).cursor, 4.0);
        assert_eq!(on_drag(TrimHandle::Playhead, 1000.0, TRACK, s).cursor, 6.0);
        assert_eq!(on_drag(TrimHandle::Playhead, 1000.0, TRACK, s).trim, s.trim);
    }

    #[test]
    fn test_short_source_trim_is_fixed() {
        let s = state(0.0, 0.3, 0.0, 0.3);
        assert_eq!(on_drag(TrimHandle::Start, 500.0, TRACK, s), s);
        assert_eq!(on_drag(TrimHandle::End, 200.0, TRACK, s), s);
    }
}
