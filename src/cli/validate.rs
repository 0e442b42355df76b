// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::pipeline_dir;
use crate::pipeline::{Pipeline, PipelineValidator};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let pipeline = match Pipeline::from_file(&pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to load pipeline", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Pipeline file parses", "✓".green());

    let validation = PipelineValidator::validate(&pipeline);
    let missing_files =
        PipelineValidator::validate_files(&pipeline, &pipeline_dir(&pipeline_path));

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    // Datasets may be produced later; a missing one is only a warning here
    if !missing_files.is_empty() {
        println!();
        println!("{}:", "Missing files".yellow().bold());
        for missing in &missing_files {
            println!("  {} {}", "⚠".yellow(), missing);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", pipeline.name);
        println!(
            "  Settings: target '{}', seed {}, test fraction {}, C {}, gamma {}",
            pipeline.settings.target_column,
            pipeline.settings.seed,
            pipeline.settings.test_fraction,
            pipeline.settings.svm.c,
            pipeline.settings.svm.gamma
        );
        println!("  Steps: {}", pipeline.steps.len());
        for step in &pipeline.steps {
            let deps = if step.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", step.depends_on.join(", "))
            };
            println!(
                "    - {} ({}: {}){}",
                step.name,
                step.runtime,
                step.transform.name(),
                deps.dimmed()
            );
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Pipeline validation failed"));
    }

    if validation.has_warnings() || !missing_files.is_empty() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
    Ok(())
}
