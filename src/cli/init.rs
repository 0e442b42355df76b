// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Init command - write the default heart-disease pipeline

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::pipeline::DEFAULT_PIPELINE_FILE;

/// Run the init command
pub async fn run(name: Option<String>, force: bool, verbose: bool) -> Result<()> {
    let pipeline_name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "heart".to_string())
    });

    println!("{}", "Initializing svmflow pipeline...".bold());
    println!();

    if Path::new(DEFAULT_PIPELINE_FILE).exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            DEFAULT_PIPELINE_FILE
        ));
    }

    let pipeline_content = default_pipeline(&pipeline_name);

    std::fs::write(DEFAULT_PIPELINE_FILE, &pipeline_content).map_err(|e| {
        miette::miette!("Failed to write {}: {}", DEFAULT_PIPELINE_FILE, e)
    })?;

    println!("  {} Created {}", "✓".green(), DEFAULT_PIPELINE_FILE);

    println!();
    println!("{}", "Pipeline initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Put the dataset at {} (binary {} column)",
        "heart.csv".cyan(),
        "target".cyan()
    );
    println!("  2. Run {} to check the pipeline", "svmflow validate".cyan());
    println!("  3. Run {} to build every artifact", "svmflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", pipeline_content.dimmed());
    }

    Ok(())
}

/// The default pipeline: load, encode, explore, train, evaluate in `ds`,
/// then hand the evaluation table to `stats` for the confusion matrix
pub fn default_pipeline(name: &str) -> String {
    let name = quoted(name);
    format!(
        r#"# svmflow pipeline configuration

version: "1"
name: {name}
description: "RBF SVM on the heart-disease dataset"

settings:
  target_column: target
  seed: 42
  test_fraction: 0.3
  svm:
    c: 1.0
    gamma: scale

cache:
  enabled: true
  directory: .svmflow/store

steps:
  - name: raw_df
    runtime: ds
    transform: {{ type: read_dataset, path: heart.csv }}

  - name: encoded_df
    runtime: ds
    transform: {{ type: encode_categoricals }}
    depends_on: [raw_df]

  - name: target_dist_png
    description: "Class balance of the target column"
    runtime: ds
    transform: {{ type: target_distribution_plot }}
    depends_on: [encoded_df]
    encoder: copy_file

  - name: corr_heatmap_png
    description: "Pairwise Pearson correlations"
    runtime: ds
    transform: {{ type: correlation_heatmap }}
    depends_on: [encoded_df]
    encoder: copy_file

  - name: processed_data
    runtime: ds
    transform: {{ type: make_processed_data }}
    depends_on: [encoded_df]

  - name: model
    runtime: ds
    transform: {{ type: train_svm_rbf }}
    depends_on: [processed_data]

  - name: y_pred
    runtime: ds
    transform: {{ type: predict_labels }}
    depends_on: [model, processed_data]

  - name: accuracy
    runtime: ds
    transform: {{ type: compute_accuracy }}
    depends_on: [processed_data, y_pred]

  - name: evaluation_df
    description: "Holdout truth and estimate, handed to stats as CSV"
    runtime: ds
    transform: {{ type: make_evaluation_df }}
    depends_on: [processed_data, y_pred]
    encoder: csv

  - name: evaluation_factored
    runtime: stats
    transform: {{ type: factorize_evaluation }}
    depends_on: [evaluation_df]
    decoder: csv

  - name: confusion
    runtime: stats
    transform: {{ type: confusion_matrix }}
    depends_on: [evaluation_factored]

  - name: confusion_plot
    runtime: stats
    transform: {{ type: confusion_matrix_plot }}
    depends_on: [confusion]
    encoder: copy_file
"#
    )
}

/// A double-quoted YAML scalar; JSON string syntax is a subset of it
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"pipeline\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, PipelineValidator};

    #[test]
    fn test_default_pipeline_is_valid() {
        let pipeline = Pipeline::from_yaml(&default_pipeline("heart")).unwrap();
        assert_eq!(pipeline.name, "heart");
        assert_eq!(pipeline.steps.len(), 12);

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_name_with_yaml_syntax_is_escaped() {
        for name in ["a\"b", "x: y", "back\\slash", "#comment", "line\nbreak"] {
            let pipeline = Pipeline::from_yaml(&default_pipeline(name)).unwrap();
            assert_eq!(pipeline.name, name);
            assert_eq!(pipeline.steps.len(), 12);
        }
    }
}
