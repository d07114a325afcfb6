//! Cropcut Export
//!
//! Turns an edit session into a rendered clip:
//! - [`compiler`] builds a deterministic ffmpeg pipeline description
//! - [`engine`] runs it (ffmpeg behind the [`EncodingEngine`] trait)
//! - [`controller`] serializes exports and reports progress

pub mod compiler;
pub mod controller;
pub mod engine;

pub use compiler::{compile, tempo_stages, CompileError, ExportCompiler, PipelineDescription, StageKind};
pub use controller::{
    ExportController, ExportPhase, ExportProgress, ExportRequest, EngineLoader, FfmpegLoader,
    ProgressCallback,
};
pub use engine::{EncodedOutput, EncodingEngine, FfmpegEngine, ProgressSink};
