//! Extract timeline thumbnails.

use std::path::PathBuf;

use anyhow::Context;
use cropcut_common::config::AppConfig;
use cropcut_media::ThumbnailSampler;

use super::edit::SourceArgs;

pub async fn run(
    source: SourceArgs,
    count: usize,
    width: u32,
    out: PathBuf,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let media = source.load(config).await?;
    let sampler = ThumbnailSampler::from_config(config).with_width(width);
    let thumbnails = sampler.sample(&media.path, &media.metadata, count).await;

    if thumbnails.is_empty() {
        println!("No thumbnails extracted (run with --verbose for details).");
        return Ok(());
    }

    tokio::fs::create_dir_all(&out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let stem = media
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());

    for (index, thumb) in thumbnails.iter().enumerate() {
        let path = out.join(format!("{stem}_thumb_{index:02}.png"));
        tokio::fs::write(&path, &thumb.png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  {:>8.3}s  {}", thumb.time_secs, path.display());
    }
    println!("Wrote {} thumbnails to {}", thumbnails.len(), out.display());

    Ok(())
}
