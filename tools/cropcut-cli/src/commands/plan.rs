//! Print the compiled export pipeline without running it.

use std::path::PathBuf;

use cropcut_common::config::AppConfig;
use cropcut_export::engine::partial_path;
use cropcut_export::ExportCompiler;

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

    let pipeline = ExportCompiler::new(config.presets.clone()).compile(&session, &media.metadata)?;
    println!("{}", serde_json::to_string_pretty(&pipeline)?);
    println!();

    let program = config.tools.ffmpeg.display().to_string();
    let invocations = pipeline.invocations(&request.input, &partial_path(&request.output));
    for (pass, args) in invocations.iter().enumerate() {
        println!("# pass {} of {}", pass + 1, invocations.len());
        let line: Vec<String> = std::iter::once(program.clone())
            .chain(args.iter().map(|a| shell_quote(a)))
            .collect();
        println!("{}", line.join(" "));
    }
    println!("# then rename to {}", request.output.display());

    Ok(())
}

/// Single-quote arguments the shell would split or expand.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=:,./+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
