//! Export orchestration.
//!
//! [`ExportController`] compiles a session snapshot, hands the pipeline to a
//! lazily created encoding engine, and relays progress. At most one export
//! runs per controller; a second request while one is in flight fails with
//! [`CropcutError::ExportInProgress`]. Dropping the export future cancels it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cropcut_common::config::AppConfig;
use cropcut_common::error::{CropcutError, CropcutResult};
use cropcut_edit_model::metadata::SourceMetadata;
use cropcut_edit_model::session::{output_file_name, EditSession, ExportFormat};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::compiler::{ExportCompiler, PipelineDescription};
use crate::engine::{EncodedOutput, EncodingEngine, FfmpegEngine};

/// Coarse export phase shown next to the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    Preparing,
    Encoding,
    Finalizing,
    Complete,
}

impl ExportPhase {
    /// `0` preparing, below `95` encoding, below `100` finalizing.
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            ExportPhase::Complete
        } else if percent >= 95.0 {
            ExportPhase::Finalizing
        } else if percent > 0.0 {
            ExportPhase::Encoding
        } else {
            ExportPhase::Preparing
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportPhase::Preparing => "Preparing",
            ExportPhase::Encoding => "Encoding",
            ExportPhase::Finalizing => "Finalizing",
            ExportPhase::Complete => "Complete",
        }
    }
}

/// Export progress report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportProgress {
    /// Percentage in `[0, 100]`; never decreases within one export.
    pub percent: f64,
    pub phase: ExportPhase,
}

impl ExportProgress {
    fn at(percent: f64) -> Self {
        Self {
            percent,
            phase: ExportPhase::from_percent(percent),
        }
    }
}

/// Progress callback for exports.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// One export: a snapshot of the session plus the files involved.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub session: EditSession,
    pub metadata: SourceMetadata,
}

impl ExportRequest {
    /// Export into `output_dir` using the `{stem}_edited_{date}.{ext}` name.
    pub fn into_dir(
        input: impl Into<PathBuf>,
        output_dir: &Path,
        session: &EditSession,
        metadata: &SourceMetadata,
    ) -> Self {
        let input = input.into();
        let original = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = output_dir.join(default_output_name(&original, session.format));
        Self {
            input,
            output,
            session: session.clone(),
            metadata: metadata.clone(),
        }
    }
}

/// Export file name for today's UTC date.
pub fn default_output_name(original_name: &str, format: ExportFormat) -> String {
    output_file_name(original_name, format, chrono::Utc::now().date_naive())
}

/// Creates the encoding engine on first use.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> CropcutResult<Arc<dyn EncodingEngine>>;
}

/// Loads [`FfmpegEngine`] from a configured binary path.
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    ffmpeg: PathBuf,
}

impl FfmpegLoader {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self) -> CropcutResult<Arc<dyn EncodingEngine>> {
        let engine = FfmpegEngine::initialize(self.ffmpeg.clone()).await?;
        Ok(Arc::new(engine))
    }
}

/// Clears the in-flight flag however the export ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Forwards progress, dropping any report lower than the last one.
struct MonotonicProgress {
    last: Mutex<f64>,
    callback: Option<ProgressCallback>,
}

impl MonotonicProgress {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            last: Mutex::new(0.0),
            callback,
        }
    }

    fn report(&self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if percent < *last {
            return;
        }
        *last = percent;
        drop(last);
        if let Some(cb) = &self.callback {
            cb(ExportProgress::at(percent));
        }
    }
}

/// Runs exports, one at a time.
pub struct ExportController<L> {
    loader: L,
    engine: OnceCell<Arc<dyn EncodingEngine>>,
    compiler: ExportCompiler,
    in_flight: AtomicBool,
    timeout: Option<Duration>,
}

impl ExportController<FfmpegLoader> {
    /// Controller using the configured ffmpeg, presets, and timeout.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            FfmpegLoader::new(config.tools.ffmpeg.clone()),
            ExportCompiler::new(config.presets.clone()),
        )
        .with_timeout(config.timeouts.export_timeout_secs.map(Duration::from_secs))
    }
}

impl<L: EngineLoader> ExportController<L> {
    pub fn new(loader: L, compiler: ExportCompiler) -> Self {
        Self {
            loader,
            engine: OnceCell::new(),
            compiler,
            in_flight: AtomicBool::new(false),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn compiler(&self) -> &ExportCompiler {
        &self.compiler
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Compile without encoding.
    pub fn plan(&self, session: &EditSession, metadata: &SourceMetadata) -> CropcutResult<PipelineDescription> {
        Ok(self.compiler.compile(session, metadata)?)
    }

    async fn engine(&self) -> CropcutResult<Arc<dyn EncodingEngine>> {
        let engine = self
            .engine
            .get_or_try_init(|| async { self.loader.load().await })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Run one export.
    pub async fn export(
        &self,
        request: ExportRequest,
        progress: Option<ProgressCallback>,
    ) -> CropcutResult<EncodedOutput> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return Err(CropcutError::ExportInProgress);
        };

        tracing::info!(
            input = %request.input.display(),
            output = %request.output.display(),
            format = %request.session.format,
            quality = %request.session.quality,
            "Starting export"
        );

        let progress = MonotonicProgress::new(progress);
        progress.report(0.0);

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(&request, &progress))
                .await
                .unwrap_or_else(|_| Err(CropcutError::timeout("export", limit.as_secs()))),
            None => self.run(&request, &progress).await,
        };

        match &result {
            Ok(output) => {
                progress.report(100.0);
                tracing::info!(
                    output = %output.path.display(),
                    size_bytes = output.size_bytes,
                    "Export complete"
                );
            }
            Err(e) => tracing::error!(error = %e, "Export failed"),
        }
        result
    }

    async fn run(&self, request: &ExportRequest, progress: &MonotonicProgress) -> CropcutResult<EncodedOutput> {
        let pipeline = self.compiler.compile(&request.session, &request.metadata)?;
        let engine = self.engine().await?;
        tracing::debug!(engine = engine.name(), "Using encoding engine");

        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Leave headroom below 100 until the file is in place.
        let on_fraction = |fraction: f64| progress.report(fraction * 99.0);
        engine
            .encode(&pipeline, &request.input, &request.output, &on_fraction)
            .await
    }
}
