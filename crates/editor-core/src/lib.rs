//! Cropcut Editor Core
//!
//! The interactive half of the editor. Every engine here is a pure,
//! synchronous function of (current state, gesture) → proposed state, cheap
//! enough to run on every pointer-move notification:
//!
//! 1. **Crop geometry**: move/resize the crop rectangle from a drag handle,
//!    honoring aspect locks, the minimum size, and the frame bounds.
//! 2. **Trim timeline**: map track positions to times and drag the trim
//!    handles or the playhead.
//! 3. **Playback sync**: keep the reported playback position inside the
//!    trim interval.
//!
//! [`Editor`] owns the [`EditSession`](cropcut_edit_model::EditSession) and
//! the per-gesture drag state, and is the only thing that mutates them.

pub mod crop;
pub mod editor;
pub mod playback;
pub mod trim;

pub use editor::Editor;
