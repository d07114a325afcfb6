//! The editing session owner.
//!
//! [`Editor`] holds the one [`EditSession`] for the loaded clip, the playback
//! cursor, and whatever drag gesture is in progress. UI layers forward raw
//! pointer events; the editor runs the pure engines and commits their
//! results. Gesture state lives only between `begin_*` and [`Editor::end_gesture`].

use cropcut_edit_model::crop::{AspectLock, AspectPreset, CropRect};
use cropcut_edit_model::metadata::SourceMetadata;
use cropcut_edit_model::session::{EditSession, ExportFormat, ExportQuality};
use cropcut_edit_model::timeline::{PlaybackCursor, TrimInterval};

use crate::crop::{self, CropHandle, DisplayScale};
use crate::playback::{self, SyncAction};
use crate::trim::{self, TimelineState, TrackRect, TrimHandle};

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Crop {
        handle: CropHandle,
        snapshot: CropRect,
        origin: (f64, f64),
        scale: DisplayScale,
    },
    Trim {
        handle: TrimHandle,
        track: TrackRect,
    },
}

/// Owns the edit state for one loaded clip.
#[derive(Debug, Clone)]
pub struct Editor {
    metadata: SourceMetadata,
    session: EditSession,
    cursor: PlaybackCursor,
    gesture: Option<Gesture>,
}

impl Editor {
    /// Start editing freshly loaded media with default parameters.
    pub fn new(metadata: SourceMetadata) -> Self {
        let session = EditSession::for_source(&metadata);
        tracing::debug!(
            width = metadata.width,
            height = metadata.height,
            duration_secs = metadata.duration_secs,
            "Editor session created"
        );
        Self {
            metadata,
            session,
            cursor: PlaybackCursor::default(),
            gesture: None,
        }
    }

    /// Resume editing with a previously saved session, repaired to fit the source.
    pub fn with_session(metadata: SourceMetadata, session: &EditSession) -> Self {
        let mut editor = Self::new(metadata);
        editor.session = session.fitted_to(&editor.metadata);
        editor.cursor.current_time = editor.session.trim.start;
        editor
    }

    /// "New video": discard everything and start over on `metadata`.
    pub fn load_media(&mut self, metadata: SourceMetadata) {
        *self = Self::new(metadata);
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    /// Duration, when known. Trim and playback stay inert without one.
    pub fn duration(&self) -> Option<f64> {
        self.metadata.known_duration()
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Begin dragging the crop handle named `handle_id` at display position
    /// `pointer`. Unknown handles or an unusable display size start nothing.
    pub fn begin_crop_drag(&mut self, handle_id: &str, pointer: (f64, f64), display_width: f64) -> bool {
        let Ok(handle) = handle_id.parse::<CropHandle>() else {
            tracing::trace!(handle_id, "ignoring unknown crop handle");
            return false;
        };
        let Some(scale) = DisplayScale::new(display_width, self.metadata.width as f64) else {
            tracing::trace!(display_width, "ignoring crop drag without display size");
            return false;
        };
        self.gesture = Some(Gesture::Crop {
            handle,
            snapshot: self.session.crop,
            origin: pointer,
            scale,
        });
        true
    }

    /// Pointer moved during a crop drag. Returns the committed rectangle.
    pub fn update_crop_drag(&mut self, pointer: (f64, f64)) -> Option<CropRect> {
        let Some(Gesture::Crop {
            handle,
            snapshot,
            origin,
            scale,
        }) = self.gesture
        else {
            return None;
        };

        let delta = scale.to_source(pointer.0 - origin.0, pointer.1 - origin.1);
        self.session.crop = crop::resize(
            snapshot,
            handle,
            delta,
            self.session.aspect_lock,
            self.metadata.frame(),
        );
        Some(self.session.crop)
    }

    /// Replace the crop with a named preset (centered, locked).
    pub fn select_aspect_preset(&mut self, preset: AspectPreset) -> CropRect {
        let (rect, lock) = crop::apply_preset(preset, self.metadata.frame());
        self.session.crop = rect;
        self.session.aspect_lock = lock;
        rect
    }

    /// Replace the crop with typed-in coordinates, fitted to the frame.
    pub fn set_crop(&mut self, rect: CropRect) -> CropRect {
        self.session.crop = rect.fitted_to(self.metadata.frame());
        self.session.aspect_lock = AspectLock::Custom;
        self.session.crop
    }

    /// Typed-in crop width; clears any aspect lock.
    pub fn set_crop_width(&mut self, width: f64) -> CropRect {
        let (rect, lock) = crop::set_width(self.session.crop, width, self.metadata.frame());
        self.session.crop = rect;
        self.session.aspect_lock = lock;
        rect
    }

    /// Typed-in crop height; clears any aspect lock.
    pub fn set_crop_height(&mut self, height: f64) -> CropRect {
        let (rect, lock) = crop::set_height(self.session.crop, height, self.metadata.frame());
        self.session.crop = rect;
        self.session.aspect_lock = lock;
        rect
    }

    pub fn begin_trim_drag(&mut self, handle: TrimHandle, track: TrackRect) -> bool {
        if self.duration().is_none() {
            return false;
        }
        self.gesture = Some(Gesture::Trim { handle, track });
        true
    }

    /// Pointer moved during a trim or playhead drag.
    pub fn update_trim_drag(&mut self, pointer_x: f64) -> Option<TimelineState> {
        let Some(Gesture::Trim { handle, track }) = self.gesture else {
            return None;
        };
        let duration = self.duration()?;

        let next = trim::on_drag(
            handle,
            pointer_x,
            track,
            TimelineState {
                trim: self.session.trim,
                cursor: self.cursor.current_time,
                duration,
            },
        );

        if next.trim != self.session.trim {
            self.session.trim = next.trim;
            self.reconcile_cursor();
        }
        if handle == TrimHandle::Playhead {
            self.cursor.current_time = next.cursor;
        }

        Some(TimelineState {
            trim: self.session.trim,
            cursor: self.cursor.current_time,
            duration,
        })
    }

    /// Release whatever gesture is active.
    pub fn end_gesture(&mut self) {
        self.gesture = None;
    }

    /// Click on the track: seek there (clamped to the trim).
    pub fn click_track(&mut self, pointer_x: f64, track: TrackRect) -> Option<f64> {
        let time = trim::on_track_click(pointer_x, track, self.duration()?)?;
        Some(self.seek(time))
    }

    /// Time under the pointer, for hover previews. Never mutates.
    pub fn hover_time(&self, pointer_x: f64, track: TrackRect) -> Option<f64> {
        trim::time_at(pointer_x, track, self.duration()?)
    }

    /// Replace the trim interval directly (e.g. numeric entry).
    pub fn set_trim(&mut self, trim: TrimInterval) -> TrimInterval {
        if let Some(duration) = self.duration() {
            self.session.trim = trim.fitted_to(duration);
            self.reconcile_cursor();
        }
        self.session.trim
    }

    /// Explicit seek; the target is clamped to the trim before it is applied.
    pub fn seek(&mut self, time: f64) -> f64 {
        if self.duration().is_some() {
            self.cursor.current_time = playback::seek_target(time, self.session.trim);
        }
        self.cursor.current_time
    }

    /// Play/pause. Playing from the trim end restarts at the trim start.
    /// Returns whether playback is now running.
    pub fn toggle_play(&mut self) -> bool {
        if self.cursor.playing {
            self.cursor.playing = false;
            return false;
        }
        if self.duration().is_some() {
            self.cursor.current_time =
                playback::resume_position(self.cursor.current_time, self.session.trim);
        }
        self.cursor.playing = true;
        true
    }

    /// The player reported its position. Returns what the player must do.
    pub fn on_playback_position(&mut self, reported: f64) -> SyncAction {
        if self.duration().is_none() {
            if reported.is_finite() {
                self.cursor.current_time = reported;
            }
            return SyncAction::None;
        }

        let action = playback::reconcile(reported, self.session.trim, self.cursor.playing);
        self.apply_sync(action, reported);
        action
    }

    fn reconcile_cursor(&mut self) {
        let action = playback::reconcile(
            self.cursor.current_time,
            self.session.trim,
            self.cursor.playing,
        );
        self.apply_sync(action, self.cursor.current_time);
    }

    fn apply_sync(&mut self, action: SyncAction, reported: f64) {
        match action {
            SyncAction::None => {
                if reported.is_finite() {
                    self.cursor.current_time = reported;
                }
            }
            SyncAction::ClampTo { time } => self.cursor.current_time = time,
            SyncAction::Stop { clamp_to } => {
                self.cursor.current_time = clamp_to;
                self.cursor.playing = false;
            }
        }
    }

    /// A late duration arrived from the repair probe. Applied at most once.
    /// An untouched trim follows the new duration; an edited one is refitted.
    pub fn apply_duration_correction(&mut self, secs: f64) -> bool {
        let previous = self.metadata.known_duration();
        if !self.metadata.apply_duration_correction(secs) {
            tracing::warn!(secs, "Ignoring duration correction");
            return false;
        }

        let untouched = previous.map_or(true, |d| self.session.trim.is_full(d));
        self.session.trim = if untouched {
            TrimInterval::full(secs)
        } else {
            self.session.trim.fitted_to(secs)
        };
        self.reconcile_cursor();

        tracing::info!(
            previous = ?previous,
            duration_secs = secs,
            "Applied duration correction"
        );
        true
    }

    pub fn set_speed(&mut self, speed: f64) -> f64 {
        self.session.set_speed(speed)
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.session.format = format;
    }

    pub fn set_quality(&mut self, quality: ExportQuality) {
        self.session.quality = quality;
    }
}
