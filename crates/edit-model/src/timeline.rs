//! Trim interval and playback cursor.

use serde::{Deserialize, Serialize};

/// Shortest allowed trim interval, in seconds.
pub const MIN_TRIM_DURATION: f64 = 0.5;

const TIME_EPSILON: f64 = 1e-9;

/// The retained `[start, end]` range of the source, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimInterval {
    pub start: f64,
    pub end: f64,
}

impl TrimInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `[0, duration]`; collapses to `[0, 0]` when the duration is unknown.
    pub fn full(duration_secs: f64) -> Self {
        let end = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            0.0
        };
        Self::new(0.0, end)
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Clamp a time into the interval.
    pub fn clamp_time(&self, t: f64) -> f64 {
        t.max(self.start).min(self.end)
    }

    pub fn is_full(&self, duration_secs: f64) -> bool {
        self.start.abs() < TIME_EPSILON && (self.end - duration_secs).abs() < TIME_EPSILON
    }

    /// Whether the interval satisfies the trim invariants for `duration_secs`.
    pub fn is_valid_for(&self, duration_secs: f64) -> bool {
        if !self.start.is_finite() || !self.end.is_finite() {
            return false;
        }
        if duration_secs < MIN_TRIM_DURATION {
            return self.is_full(duration_secs);
        }
        self.start >= -TIME_EPSILON
            && self.end <= duration_secs + TIME_EPSILON
            && self.length() >= MIN_TRIM_DURATION - TIME_EPSILON
    }

    /// Force an arbitrary interval into `[0, duration]` keeping at least
    /// `MIN_TRIM_DURATION`. The start wins when both bounds conflict.
    pub fn fitted_to(&self, duration_secs: f64) -> Self {
        if !duration_secs.is_finite() || duration_secs < MIN_TRIM_DURATION {
            return Self::full(duration_secs);
        }
        let start = if self.start.is_finite() { self.start } else { 0.0 };
        let end = if self.end.is_finite() {
            self.end
        } else {
            duration_secs
        };

        let start = start.clamp(0.0, duration_secs - MIN_TRIM_DURATION);
        let end = end.clamp((start + MIN_TRIM_DURATION).min(duration_secs), duration_secs);
        Self::new(start, end)
    }
}

/// Current playback position and transport state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackCursor {
    /// Position in seconds on the source timeline.
    pub current_time: f64,
    pub playing: bool,
}

impl PlaybackCursor {
    pub fn at(current_time: f64) -> Self {
        Self {
            current_time,
            playing: false,
        }
    }
}
