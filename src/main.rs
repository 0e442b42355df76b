// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! svmflow - Declarative SVM pipeline
//!
//! Train and evaluate an RBF SVM from a declared, cached list of steps.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use svmflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "svmflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { name, force } => svmflow::cli::init::run(name, force, cli.verbose).await,
        Commands::Run {
            pipeline,
            step,
            no_cache,
            dry_run,
        } => svmflow::cli::run::run(pipeline, step, no_cache, dry_run, cli.verbose).await,
        Commands::Watch { pipeline, debounce } => {
            svmflow::cli::watch::run(pipeline, debounce, cli.verbose).await
        }
        Commands::Validate { pipeline } => {
            svmflow::cli::validate::run(pipeline, cli.verbose).await
        }
        Commands::Show {
            step,
            pipeline,
            output,
        } => svmflow::cli::show::run(step, pipeline, output, cli.verbose).await,
        Commands::Cache { pipeline, action } => {
            svmflow::cli::cache::run(pipeline, action, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            svmflow::cli::graph::run(pipeline, format, cli.verbose).await
        }
    }
}
