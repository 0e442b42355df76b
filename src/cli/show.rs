// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Show command - print or export a built artifact

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::open_store;
use crate::artifact::Artifact;
use crate::frame::write_to_csv;

/// Run the show command
pub async fn run(
    step: String,
    pipeline_path: PathBuf,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let store = open_store(&pipeline_path);

    let path = store.path_of(&step)?;
    let artifact = store.load(&step)?;

    println!("{} {}", step.bold(), format!("({})", artifact.kind()).dimmed());
    print!("{}", artifact.summary());

    if verbose {
        let manifest = store.manifest()?;
        if let Some(entry) = manifest.get(&step) {
            println!();
            println!("  Key:   {}", entry.key.dimmed());
            println!("  Codec: {}", entry.codec);
        }
    }
    println!("  Path:  {}", path.display());

    if let Some(dest) = output {
        // Frames asked for as .csv are written as a table, not the stored codec
        let as_table = dest.extension().is_some_and(|ext| ext == "csv");
        let written = match &artifact {
            Artifact::Frame(df) if as_table => write_to_csv(df, &dest)?,
            _ => store.export(&step, &dest)?,
        };
        println!("  {} Copied to {}", "✓".green(), written.display());
    }

    Ok(())
}
