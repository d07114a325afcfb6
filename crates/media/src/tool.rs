//! Running ffmpeg/ffprobe as child processes.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use cropcut_common::error::{CropcutError, CropcutResult};
use tokio::process::Command;

/// Captured output of a finished tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Display name of a tool path (`/usr/bin/ffprobe` → `ffprobe`).
pub fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string_lossy().into_owned())
}

/// Run `program` with `args`, failing on spawn errors, a non-zero exit, or
/// when `limit` elapses. The child is killed if the future is dropped.
pub async fn run_tool<I, S>(program: &Path, args: I, limit: Duration) -> CropcutResult<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let name = tool_name(program);
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    tracing::trace!(tool = %name, ?args, "Running tool");

    let child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CropcutError::engine(format!("Failed to start {name}: {e}")))?;

    let output = tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| CropcutError::timeout(name.clone(), limit.as_secs()))?
        .map_err(|e| CropcutError::engine(format!("Failed to wait on {name}: {e}")))?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(CropcutError::engine(format!(
            "{name} failed (status {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(ToolOutput {
        stdout: output.stdout,
        stderr,
    })
}

/// First line of `<program> -version`, or `None` when it cannot be run.
pub async fn tool_version(program: &Path) -> Option<String> {
    let output = run_tool(program, ["-version"], Duration::from_secs(5)).await.ok()?;
    output
        .stdout_text()
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}
