// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Watch command - re-run pipeline on file changes

use colored::Colorize;
use miette::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use super::{pipeline_dir, store_root};
use crate::cache::ArtifactStore;
use crate::pipeline::{format_report, ExecutionOptions, Pipeline, PipelineExecutor};

/// Run the watch command
pub async fn run(pipeline_path: PathBuf, debounce_ms: u64, verbose: bool) -> Result<()> {
    // Fail early on a missing or unparsable file
    Pipeline::from_file(&pipeline_path)?;

    let base_dir = pipeline_dir(&pipeline_path);

    println!("{}", "Starting watch mode...".bold());
    println!("Watching for changes (debounce: {}ms)", debounce_ms);
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    let (tx, rx) = channel();

    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(&base_dir, RecursiveMode::Recursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    // Initial run
    run_pipeline(&pipeline_path, verbose).await;

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // The store changes on every run; only inputs count
                let ignored = ignored_dirs(&pipeline_path);
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| !is_ignored(&e.path, &ignored))
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .collect();

                if !relevant.is_empty() {
                    println!();
                    println!("{}", "─".repeat(50).dimmed());
                    println!(
                        "{}: {} file(s) changed",
                        "Change detected".yellow(),
                        relevant.len()
                    );

                    if verbose {
                        for event in &relevant {
                            println!("  {}", event.path.display());
                        }
                    }

                    println!();
                    run_pipeline(&pipeline_path, verbose).await;
                }
            }
            Ok(Err(e)) => {
                eprintln!("{}: {:?}", "Watch error".red(), e);
            }
            Err(e) => {
                // Channel closed
                eprintln!("{}: {}", "Channel error".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Directories whose changes never trigger a run
fn ignored_dirs(pipeline_path: &Path) -> Vec<PathBuf> {
    let base_dir = pipeline_dir(pipeline_path);
    let mut dirs = vec![base_dir.join(".svmflow"), base_dir.join("target")];
    if let Ok(pipeline) = Pipeline::from_file(pipeline_path) {
        dirs.push(store_root(&pipeline, pipeline_path));
    }
    dirs.into_iter()
        .map(|d| std::fs::canonicalize(&d).unwrap_or(d))
        .collect()
}

fn is_ignored(path: &Path, ignored: &[PathBuf]) -> bool {
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    ignored.iter().any(|dir| path.starts_with(dir))
}

async fn run_pipeline(pipeline_path: &Path, verbose: bool) {
    let start = std::time::Instant::now();

    let pipeline = match Pipeline::from_file(pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {}", "Failed to load pipeline".red(), e);
            return;
        }
    };

    let store = match ArtifactStore::new(store_root(&pipeline, pipeline_path)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}: {}", "Failed to open artifact store".red(), e);
            return;
        }
    };
    let executor = PipelineExecutor::new(Arc::new(store));

    match executor
        .execute(&pipeline, &pipeline_dir(pipeline_path), &ExecutionOptions::default())
        .await
    {
        Ok(result) => {
            if verbose {
                for report in &result.steps {
                    println!("{}", format_report(report));
                }
            }

            let elapsed = start.elapsed();
            if result.success {
                println!(
                    "{} ({:.2}s, {} cached)",
                    "Pipeline completed successfully".green(),
                    elapsed.as_secs_f64(),
                    result.cached_count()
                );
            } else {
                println!("{} ({:.2}s)", "Pipeline failed".red(), elapsed.as_secs_f64());
                for (name, error) in result.failures() {
                    eprintln!("  {} {}: {}", "✗".red(), name, error.root_cause());
                }
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Pipeline execution error".red(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_changes_are_ignored() {
        let temp = tempfile::TempDir::new().unwrap();
        let pipeline_path = temp.path().join(".svmflow.yaml");
        std::fs::write(&pipeline_path, crate::cli::init::default_pipeline("heart")).unwrap();
        let entry = temp.path().join(".svmflow/store/ab/cd");
        std::fs::create_dir_all(&entry).unwrap();

        let ignored = ignored_dirs(&pipeline_path);
        assert!(is_ignored(&entry.join("entry.json"), &ignored));
        assert!(!is_ignored(&temp.path().join("heart.csv"), &ignored));
    }
}
