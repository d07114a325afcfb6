//! Keeps playback inside the trim interval.

use cropcut_edit_model::timeline::TrimInterval;
use serde::{Deserialize, Serialize};

/// What the player should do after reporting a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// Position is inside the interval.
    None,
    /// Move the position to `time` and keep the transport state.
    ClampTo { time: f64 },
    /// Pause and move the position to `time` (the trim end).
    Stop { clamp_to: f64 },
}

/// Reconcile a reported playback position with the trim interval.
pub fn reconcile(reported: f64, trim: TrimInterval, playing: bool) -> SyncAction {
    if !reported.is_finite() {
        return SyncAction::None;
    }
    if reported < trim.start {
        return SyncAction::ClampTo { time: trim.start };
    }
    if playing && reported >= trim.end {
        return SyncAction::Stop { clamp_to: trim.end };
    }
    if reported > trim.end {
        return SyncAction::ClampTo { time: trim.end };
    }
    SyncAction::None
}

/// Where an explicit seek lands. Clamped before it is applied so the player
/// never shows a frame outside the interval.
pub fn seek_target(requested: f64, trim: TrimInterval) -> f64 {
    if !requested.is_finite() {
        return trim.start;
    }
    trim.clamp_time(requested)
}

/// Where playback resumes: from the start when the cursor is at or past the
/// end (or before the start), otherwise where it is.
pub fn resume_position(cursor: f64, trim: TrimInterval) -> f64 {
    if !cursor.is_finite() || cursor >= trim.end || cursor < trim.start {
        trim.start
    } else {
        cursor
    }
}
