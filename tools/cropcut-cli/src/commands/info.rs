//! Show source metadata.

use cropcut_common::config::AppConfig;
use cropcut_edit_model::session::ExportFormat;
use cropcut_export::controller::default_output_name;

use super::edit::SourceArgs;

pub async fn run(source: SourceArgs, json: bool, config: &AppConfig) -> anyhow::Result<()> {
    let media = source.load(config).await?;
    let m = &media.metadata;

    if json {
        println!("{}", serde_json::to_string_pretty(m)?);
        return Ok(());
    }

    println!("Source: {}", media.path.display());
    println!("  Resolution: {}x{}", m.width, m.height);
    match m.known_duration() {
        Some(secs) => println!("  Duration: {secs:.3}s ({:?})", m.duration_source),
        None => println!("  Duration: unknown (trim and thumbnails unavailable)"),
    }
    println!("  Audio: {}", if m.has_audio { "yes" } else { "no" });
    println!();

    println!("Export names:");
    for format in [ExportFormat::Mp4, ExportFormat::Gif] {
        println!("  {format}: {}", default_output_name(&media.file_name(), format));
    }

    Ok(())
}
