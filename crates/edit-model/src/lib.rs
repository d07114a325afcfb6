//! Cropcut Edit Model
//!
//! Defines the data contracts shared by the interactive editor and the
//! export compiler:
//! - **Metadata:** dimensions, duration, and audio presence of the source
//! - **Crop:** the crop rectangle in source pixels and the aspect lock
//! - **Timeline:** the trim interval and the playback cursor
//! - **Session:** the single record of edit parameters plus export choices
//!
//! Crop coordinates are always source pixels; times are seconds on the
//! source timeline.

pub mod crop;
pub mod metadata;
pub mod session;
pub mod timeline;

pub use crop::*;
pub use metadata::*;
pub use session::*;
pub use timeline::*;
