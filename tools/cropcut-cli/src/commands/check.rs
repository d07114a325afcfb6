//! Check that the external media tools are available.

use cropcut_common::config::{config_file_path, AppConfig};
use cropcut_media::tool::tool_version;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Cropcut System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    let mut all_ok = true;
    for (name, path) in [("ffmpeg", &config.tools.ffmpeg), ("ffprobe", &config.tools.ffprobe)] {
        match tool_version(path).await {
            Some(version) => println!("[OK] {name}: {version}"),
            None => {
                all_ok = false;
                println!("[MISSING] {name}: could not run {}", path.display());
            }
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available. Cropcut is ready.");
    } else {
        println!("Install ffmpeg or set tools.ffmpeg / tools.ffprobe in the config file.");
    }

    Ok(())
}
