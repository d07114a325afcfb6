//! Cropcut Media
//!
//! Everything that reads the source file: ffprobe metadata, duration repair
//! for containers that report no usable length, and thumbnail sampling.
//! All external tools run as child processes under a timeout.

pub mod loader;
pub mod probe;
pub mod thumbnails;
pub mod tool;

pub use loader::{LoadRequest, MediaLoad, MediaLoader};
pub use probe::{FfprobeProber, MetadataSource, ProbedMedia};
pub use thumbnails::{thumbnail_times, Thumbnail, ThumbnailSampler};
