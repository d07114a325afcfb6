//! Write a session file for a source.

use std::path::{Path, PathBuf};

use anyhow::Context;
use cropcut_common::config::AppConfig;
use cropcut_common::error::CropcutError;

use super::edit::{EditArgs, SourceArgs};

pub async fn run(
    source: SourceArgs,
    edit: EditArgs,
    output: Option<PathBuf>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let media = source.load(config).await?;
    let session = edit.session_for(&media.metadata, config)?;

    let path = output.unwrap_or_else(|| default_session_path(&media.path));
    session
        .save(&path)
        .map_err(CropcutError::from)
        .with_context(|| format!("Failed to write session {}", path.display()))?;

    println!("Session written to {}", path.display());
    println!(
        "  Crop: {}x{} at ({}, {})",
        session.crop.width, session.crop.height, session.crop.x, session.crop.y
    );
    println!("  Trim: {:.3}s - {:.3}s", session.trim.start, session.trim.end);
    println!("  Speed: {}x", session.speed);
    println!("  Export: {} ({})", session.format, session.quality);
    println!();
    println!("Edit it, then run: cropcut export {} --session {}", media.path.display(), path.display());

    Ok(())
}

/// `<dir>/<stem>.session.json` next to the source.
fn default_session_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    input.with_file_name(format!("{stem}.session.json"))
}
