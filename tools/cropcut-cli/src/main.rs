//! Cropcut CLI: crop, trim, and re-time a single clip from the terminal.
//!
//! Usage:
//!   cropcut info <INPUT>       Show source metadata
//!   cropcut init <INPUT>       Write a default session file
//!   cropcut plan <INPUT>       Print the compiled export pipeline
//!   cropcut export <INPUT>     Render the edit
//!   cropcut thumbs <INPUT>     Extract timeline thumbnails
//!   cropcut check              Check for ffmpeg and ffprobe

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cropcut_common::config::AppConfig;
use cropcut_media::thumbnails::DEFAULT_THUMBNAIL_WIDTH;

mod commands;

use commands::edit::{EditArgs, SourceArgs};

#[derive(Parser)]
#[command(
    name = "cropcut",
    about = "Crop, trim, and speed up a single video clip",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show source metadata
    Info {
        #[command(flatten)]
        source: SourceArgs,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a session file with default (or flag-supplied) edit parameters
    Init {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        edit: EditArgs,

        /// Session file to write [default: <input stem>.session.json]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile the edit and print the pipeline without encoding
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        edit: EditArgs,

        /// Output file path used in the printed commands
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the edited clip
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        edit: EditArgs,

        /// Output file path [default: <stem>_edited_<date>.<ext>]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract evenly spaced thumbnails as PNG files
    Thumbs {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of thumbnails
        #[arg(long, default_value = "10")]
        count: usize,

        /// Thumbnail width in pixels
        #[arg(long, default_value_t = DEFAULT_THUMBNAIL_WIDTH)]
        width: u32,

        /// Directory to write the PNG files to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Check that the external media tools are available
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    cropcut_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Info { source, json } => commands::info::run(source, json, &config).await,
        Commands::Init {
            source,
            edit,
            output,
        } => commands::init::run(source, edit, output, &config).await,
        Commands::Plan {
            source,
            edit,
            output,
        } => commands::plan::run(source, edit, output, &config).await,
        Commands::Export {
            source,
            edit,
            output,
        } => commands::export::run(source, edit, output, &config).await,
        Commands::Thumbs {
            source,
            count,
            width,
            out,
        } => commands::thumbs::run(source, count, width, out, &config).await,
        Commands::Check => commands::check::run(&config).await,
    }
}
