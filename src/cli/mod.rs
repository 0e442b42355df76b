// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for svmflow.

pub mod cache;
pub mod graph;
pub mod init;
pub mod run;
pub mod show;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::cache::ArtifactStore;
use crate::pipeline::{Pipeline, DEFAULT_PIPELINE_FILE};

/// Declarative SVM pipeline
///
/// Train and evaluate an RBF SVM from a declared list of steps.
#[derive(Parser, Debug)]
#[clap(
    name = "svmflow",
    version,
    about = "Declarative, cached pipeline that trains and evaluates an RBF SVM",
    long_about = None,
    after_help = "Examples:\n\
        svmflow init                    Write the default pipeline\n\
        svmflow run                     Build every step\n\
        svmflow show confusion          Print an artifact\n\
        svmflow watch                   Watch for changes and re-run\n\n\
        See 'svmflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default pipeline file
    Init {
        /// Pipeline name (defaults to current directory name)
        name: Option<String>,

        /// Overwrite an existing pipeline file
        #[clap(short, long)]
        force: bool,
    },

    /// Run the pipeline
    Run {
        /// Pipeline file
        #[clap(short, long, env = "SVMFLOW_PIPELINE", default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Build only these steps (and what they depend on)
        #[clap(short, long)]
        step: Vec<String>,

        /// Skip cache lookups (force re-execution)
        #[clap(long)]
        no_cache: bool,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,
    },

    /// Watch mode - re-run pipeline on file changes
    Watch {
        /// Pipeline file
        #[clap(short, long, env = "SVMFLOW_PIPELINE", default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "500")]
        debounce: u64,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(env = "SVMFLOW_PIPELINE", default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,
    },

    /// Show the artifact built for a step
    Show {
        /// Step name
        step: String,

        /// Pipeline file
        #[clap(short, long, env = "SVMFLOW_PIPELINE", default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Copy the stored file to this path
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Cache management
    Cache {
        /// Pipeline file naming the store directory
        #[clap(short, long, env = "SVMFLOW_PIPELINE", default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        #[clap(subcommand)]
        action: CacheAction,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline file
        #[clap(env = "SVMFLOW_PIPELINE", default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Cache management actions
#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Clear the cache
    Clear {
        /// Skip confirmation
        #[clap(short, long)]
        yes: bool,
    },

    /// List cached entries
    List,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Directory the pipeline file lives in; dataset and store paths resolve
/// against it
pub(crate) fn pipeline_dir(pipeline_path: &Path) -> PathBuf {
    match pipeline_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Store root configured by a pipeline
pub(crate) fn store_root(pipeline: &Pipeline, pipeline_path: &Path) -> PathBuf {
    if pipeline.cache.directory.is_absolute() {
        pipeline.cache.directory.clone()
    } else {
        pipeline_dir(pipeline_path).join(&pipeline.cache.directory)
    }
}

/// Open the store a pipeline file points at, falling back to the default
/// location when the file cannot be read
pub(crate) fn open_store(pipeline_path: &Path) -> ArtifactStore {
    let root = match Pipeline::from_file(pipeline_path) {
        Ok(pipeline) => store_root(&pipeline, pipeline_path),
        Err(_) => pipeline_dir(pipeline_path).join(crate::pipeline::CacheConfig::default().directory),
    };
    ArtifactStore::open(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_format_parsing() {
        assert_eq!("DOT".parse::<GraphFormat>().unwrap(), GraphFormat::Dot);
        assert!("svg".parse::<GraphFormat>().is_err());
    }

    #[test]
    fn test_pipeline_dir() {
        assert_eq!(pipeline_dir(Path::new(".svmflow.yaml")), PathBuf::from("."));
        assert_eq!(pipeline_dir(Path::new("a/b.yaml")), PathBuf::from("a"));
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["svmflow", "-C", "proj", "run", "-s", "model", "--no-cache"])
            .unwrap();
        assert_eq!(cli.directory, Some(PathBuf::from("proj")));
        match cli.command {
            Commands::Run { step, no_cache, .. } => {
                assert_eq!(step, vec!["model"]);
                assert!(no_cache);
            }
            other => panic!("Expected Run, got {:?}", other),
        }
    }
}
