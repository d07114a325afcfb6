//! Export the edited clip.

use std::io::Write;
use std::path::PathBuf;

use cropcut_common::config::AppConfig;
use cropcut_export::{ExportController, ExportProgress, ProgressCallback};

use super::edit::{export_request, EditArgs, SourceArgs};

pub async fn run(
    source: SourceArgs,
    edit: EditArgs,
    output: Option<PathBuf>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let media = source.load(config).await?;
    let session = edit.session_for(&media.metadata, config)?;
    let request = export_request(&media, &session, output, config);

    println!("Exporting: {}", request.input.display());
    println!("  Output: {}", request.output.display());
    println!("  Format: {} ({})", session.format, session.quality);
    println!(
        "  Crop: {:.0}x{:.0} at ({:.0}, {:.0})",
        session.crop.width, session.crop.height, session.crop.x, session.crop.y
    );
    if media.metadata.known_duration().is_some() {
        println!("  Trim: {:.3}s - {:.3}s", session.trim.start, session.trim.end);
    }
    println!("  Speed: {}x", session.speed);

    let controller = ExportController::from_config(config);
    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!("\r  {}: {:.1}%  ", p.phase.label(), p.percent);
        std::io::stdout().flush().ok();
    });

    match controller.export(request, Some(progress_cb)).await {
        Ok(encoded) => {
            println!(
                "\nExport complete: {} ({} bytes, {})",
                encoded.path.display(),
                encoded.size_bytes,
                encoded.mime_type
            );
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::Error::new(e).context("Export failed"))
        }
    }
}
