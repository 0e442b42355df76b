// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! # svmflow - Declarative SVM pipeline
//!
//! `svmflow` trains and evaluates a binary RBF-kernel SVM on a tabular
//! dataset from a declared list of named steps.
//!
//! ## Features
//!
//! - **Declarative steps** - Each step names a typed transform and its inputs
//! - **Content-addressed store** - Only re-run what changed
//! - **Two runtimes** - A data-science and a statistical function set, joined
//!   by explicit encoders and decoders
//! - **Reproducible** - Seeded split and deterministic solver give
//!   byte-identical artifacts
//!
//! ## Quick Start
//!
//! ```bash
//! # Write the default heart-disease pipeline
//! svmflow init heart
//!
//! # Build everything
//! svmflow run
//!
//! # Inspect an artifact
//! svmflow show confusion
//! ```

pub mod artifact;
pub mod bridge;
pub mod cache;
pub mod cli;
pub mod errors;
pub mod frame;
pub mod pipeline;
pub mod plot;
pub mod runner;
pub mod svm;
pub mod transforms;
pub mod utils;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactKind};
pub use errors::{SvmflowError, SvmflowResult};
pub use pipeline::{Pipeline, Step};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
