//! Encoding engines.
//!
//! The engine executes a compiled [`PipelineDescription`]; it never decides
//! what the pipeline contains. Output is written to `<output>.partial` and
//! renamed into place only after every pass succeeded, so a failed or
//! dropped export never leaves a truncated file at the destination.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use cropcut_common::error::{CropcutError, CropcutResult};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::compiler::PipelineDescription;

/// Receives overall encode progress as a fraction in `[0, 1]`.
pub type ProgressSink<'a> = dyn Fn(f64) + Send + Sync + 'a;

/// A finished export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedOutput {
    pub path: PathBuf,
    pub container: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Something that can run a pipeline description.
#[async_trait]
pub trait EncodingEngine: Send + Sync {
    /// Encode `input` into `output` following `pipeline`.
    async fn encode(
        &self,
        pipeline: &PipelineDescription,
        input: &Path,
        output: &Path,
        progress: &ProgressSink<'_>,
    ) -> CropcutResult<EncodedOutput>;

    /// Engine name, for logs.
    fn name(&self) -> &str;
}

/// `<output>.partial`.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Removes its files on drop unless committed.
struct ScratchFiles {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl ScratchFiles {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

// Removal is synchronous: a failed encode must not return while its partial
// output is still on disk.
impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
                }
            }
        }
        if !self.committed {
            tracing::debug!(files = self.paths.len(), "Discarded partial export output");
        }
    }
}

/// [`EncodingEngine`] that drives the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    version: String,
}

impl FfmpegEngine {
    /// Locate ffmpeg and record its version. Fails when it cannot be run.
    pub async fn initialize(ffmpeg: impl Into<PathBuf>) -> CropcutResult<Self> {
        let ffmpeg = ffmpeg.into();
        let version = cropcut_media::tool::tool_version(&ffmpeg)
            .await
            .ok_or_else(|| {
                CropcutError::unsupported(format!(
                    "ffmpeg not available at `{}`",
                    ffmpeg.display()
                ))
            })?;
        tracing::info!(ffmpeg = %ffmpeg.display(), %version, "Encoding engine ready");
        Ok(Self { ffmpeg, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    async fn run_pass(
        &self,
        args: &[String],
        expected_duration_secs: Option<f64>,
        on_fraction: &ProgressSink<'_>,
    ) -> CropcutResult<()> {
        tracing::debug!(?args, "Running ffmpeg");
        let mut child = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CropcutError::engine(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CropcutError::engine("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CropcutError::engine("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CropcutError::engine(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                on_fraction(state.fraction(expected_duration_secs));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CropcutError::engine(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(CropcutError::engine(format!(
                "ffmpeg failed (status {status}): {}",
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EncodingEngine for FfmpegEngine {
    async fn encode(
        &self,
        pipeline: &PipelineDescription,
        input: &Path,
        output: &Path,
        progress: &ProgressSink<'_>,
    ) -> CropcutResult<EncodedOutput> {
        let partial = partial_path(output);
        let palette = PipelineDescription::palette_path(&partial);
        let scratch = ScratchFiles::new(vec![partial.clone(), palette]);

        let passes = pipeline.invocations(input, &partial);
        let total = passes.len() as f64;
        let started = std::time::Instant::now();

        for (index, args) in passes.iter().enumerate() {
            let base = index as f64;
            let scaled = |fraction: f64| progress((base + fraction.clamp(0.0, 1.0)) / total);
            self.run_pass(args, pipeline.output_duration_secs, &scaled).await?;
            tracing::debug!(pass = index + 1, passes = passes.len(), "ffmpeg pass finished");
        }

        let size_bytes = tokio::fs::metadata(&partial).await.map(|m| m.len()).unwrap_or(0);
        if size_bytes == 0 {
            return Err(CropcutError::engine("ffmpeg produced an empty file"));
        }
        tokio::fs::rename(&partial, output).await?;
        scratch.commit();

        tracing::info!(
            output = %output.display(),
            size_bytes,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Export written"
        );
        progress(1.0);

        Ok(EncodedOutput {
            path: output.to_path_buf(),
            container: pipeline.container.clone(),
            mime_type: pipeline.mime_type.clone(),
            size_bytes,
        })
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Accumulates `-progress pipe:1` key/value reports.
#[derive(Debug, Default)]
pub(crate) struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    pub(crate) fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "out_time" => {
                if let Some(secs) = parse_clock(value.trim()) {
                    self.out_time_secs = secs;
                }
            }
            "progress" => {
                self.complete = value.trim() == "end";
            }
            _ => {}
        }
    }

    /// Fraction of this pass, `0` while the expected length is unknown.
    pub(crate) fn fraction(&self, expected_duration_secs: Option<f64>) -> f64 {
        if self.complete {
            return 1.0;
        }
        match expected_duration_secs {
            Some(expected) if expected > 0.0 => (self.out_time_secs / expected).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// `HH:MM:SS.micro` → seconds.
fn parse_clock(value: &str) -> Option<f64> {
    if value.starts_with('-') {
        return None;
    }
    let mut parts = value.splitn(3, ':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    total.is_finite().then_some(total)
}
