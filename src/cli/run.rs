// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{pipeline_dir, store_root};
use crate::cache::ArtifactStore;
use crate::errors::RecoverySuggestion;
use crate::pipeline::{
    DagBuilder, ExecutionOptions, Pipeline, PipelineExecutor, PipelineResult, PipelineValidator,
    StepOutcome,
};
use crate::utils::create_progress_bar;

/// Run the pipeline
pub async fn run(
    pipeline_path: PathBuf,
    steps: Vec<String>,
    no_cache: bool,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_file(&pipeline_path)?;

    // Validate up front so every problem is listed, not just the first
    let validation = PipelineValidator::validate(&pipeline);

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let base_dir = pipeline_dir(&pipeline_path);
    let missing = PipelineValidator::validate_files(&pipeline, &base_dir);
    if !missing.is_empty() && !dry_run {
        eprintln!("{}", "Missing input files:".red().bold());
        for file in &missing {
            eprintln!("  {} {}", "✗".red(), file);
        }
        return Err(miette::miette!("Required datasets are missing"));
    }

    let store = ArtifactStore::new(store_root(&pipeline, &pipeline_path))?;
    let executor = PipelineExecutor::new(Arc::new(store));

    let dag = DagBuilder::build(&pipeline)?;
    let plan = if steps.is_empty() {
        dag.topological_order_names()
    } else {
        dag.closure_of(&steps)?
    };
    print_execution_plan(&pipeline, &plan, &dag);

    let progress = (!dry_run).then(|| create_progress_bar(plan.len() as u64, "Building"));
    let options = ExecutionOptions {
        no_cache,
        dry_run,
        targets: steps,
        progress: progress.clone(),
    };

    let result = executor.execute(&pipeline, &base_dir, &options).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = result?;

    if dry_run {
        println!("{}", "Dry run: nothing was built.".dimmed());
        return Ok(());
    }

    print_summary(&result, verbose);

    if !result.success {
        return Err(miette::miette!("Pipeline execution failed"));
    }

    Ok(())
}

/// Print the execution plan
fn print_execution_plan(pipeline: &Pipeline, plan: &[String], dag: &DagBuilder) {
    println!();
    println!("{}: {}", "Pipeline".bold(), pipeline.name);
    println!("{}", "═".repeat(50));
    println!(
        "Execution plan ({} step{}):",
        plan.len(),
        if plan.len() == 1 { "" } else { "s" }
    );
    println!();

    for (i, name) in plan.iter().enumerate() {
        let Some(step) = pipeline.get_step(name) else {
            continue;
        };
        let deps = dag.dependencies(name).unwrap_or_default();

        print!(
            "  {}. {} ({}: {})",
            i + 1,
            step.name.bold(),
            step.runtime,
            step.transform.name()
        );

        if !deps.is_empty() {
            print!(" {}", format!("[depends: {}]", deps.join(", ")).dimmed());
        }

        println!();
    }

    println!();
}

fn print_summary(result: &PipelineResult, verbose: bool) {
    let built = result
        .steps
        .iter()
        .filter(|r| matches!(r.outcome, StepOutcome::Built { .. }))
        .count();

    println!();
    if result.success {
        println!(
            "{}",
            format!(
                "Pipeline completed successfully in {:.2}s ({} built, {} cached)",
                result.duration.as_secs_f64(),
                built,
                result.cached_count()
            )
            .green()
        );
        return;
    }

    println!(
        "{}",
        format!("Pipeline failed after {:.2}s", result.duration.as_secs_f64()).red()
    );
    for (name, error) in result.failures() {
        eprintln!();
        eprintln!("{}", format!("Step '{}' failed:", name).red().bold());
        eprintln!("  {}", error.root_cause());
        if let Some(suggestion) = RecoverySuggestion::for_error(error) {
            if verbose {
                eprintln!("{}", suggestion);
            } else {
                eprintln!("  {} {}", "hint:".cyan(), suggestion.action);
            }
        }
    }
}
