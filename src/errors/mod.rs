// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Error types with actionable messages
//!
//! Every failure names the step (or file) it came from and the expectation
//! that was violated, so a broken pipeline can be fixed from the message alone.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for svmflow operations
pub type SvmflowResult<T> = Result<T, SvmflowError>;

/// Main error type for svmflow
#[derive(Error, Debug, Diagnostic)]
pub enum SvmflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Graph construction
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step name '{step}' is declared more than once")]
    #[diagnostic(
        code(svmflow::duplicate_name),
        help("Step names identify artifacts and must be unique within a pipeline")
    )]
    DuplicateName { step: String },

    #[error("Step '{step}' depends on '{dependency}', which is {reason}")]
    #[diagnostic(
        code(svmflow::dependency),
        help("Dependencies may only reference steps declared earlier in the list")
    )]
    Dependency {
        step: String,
        dependency: String,
        reason: DependencyProblem,
    },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(svmflow::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' is invalid: {reason}")]
    #[diagnostic(code(svmflow::invalid_step))]
    InvalidStep { step: String, reason: String },

    #[error("Step '{step}' cannot receive '{dependency}' across runtimes: {reason}")]
    #[diagnostic(
        code(svmflow::bridge),
        help("Artifacts crossing from one runtime to another need an encoder on the producer and a decoder on the consumer")
    )]
    Bridge {
        step: String,
        dependency: String,
        reason: String,
    },

    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(svmflow::pipeline_not_found),
        help("Create a pipeline with 'svmflow init'")
    )]
    PipelineNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // Transform errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Schema error: {message}")]
    #[diagnostic(code(svmflow::schema))]
    Schema { message: String },

    #[error("Shape error: {message}")]
    #[diagnostic(code(svmflow::shape))]
    Shape { message: String },

    #[error("Training failed: {message}")]
    #[diagnostic(code(svmflow::training))]
    Training { message: String },

    #[error("Step '{step}' failed: {source}")]
    #[diagnostic(code(svmflow::step_failed))]
    StepFailed {
        step: String,
        #[source]
        source: Box<SvmflowError>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Artifact store
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No artifact named '{name}' has been built")]
    #[diagnostic(code(svmflow::unknown_artifact))]
    UnknownArtifact {
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("Cache error: {message}")]
    #[diagnostic(code(svmflow::cache_error))]
    CacheError { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("File not found: {path}")]
    #[diagnostic(code(svmflow::file_not_found))]
    FileNotFound {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(svmflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(svmflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/format errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(svmflow::io_error))]
    Io { message: String },

    #[error("CSV error: {message}")]
    #[diagnostic(code(svmflow::csv_error))]
    Csv { message: String },

    #[error("Data frame error: {message}")]
    #[diagnostic(code(svmflow::frame_error))]
    Frame { message: String },

    #[error("PNG encoding error: {message}")]
    #[diagnostic(code(svmflow::png_error))]
    Png { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(svmflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(svmflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(svmflow::toml_error))]
    Toml { message: String },
}

/// Why a dependency reference could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyProblem {
    /// No step with that name exists anywhere in the list
    Undeclared,
    /// The step exists but is declared at or after the referencing step
    ForwardReference,
}

impl std::fmt::Display for DependencyProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undeclared => write!(f, "not declared"),
            Self::ForwardReference => write!(f, "declared later (forward reference)"),
        }
    }
}

impl From<std::io::Error> for SvmflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<polars::prelude::PolarsError> for SvmflowError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        Self::Frame { message: e.to_string() }
    }
}

impl From<png::EncodingError> for SvmflowError {
    fn from(e: png::EncodingError) -> Self {
        Self::Png { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for SvmflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for SvmflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for SvmflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl SvmflowError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema { message: message.into() }
    }

    /// Create a shape error
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape { message: message.into() }
    }

    /// Attach the failing step name to a transform error
    pub fn in_step(self, step: &str) -> Self {
        match self {
            // Already attributed
            Self::StepFailed { .. } => self,
            other => Self::StepFailed {
                step: step.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Create a file not found error with context
    pub fn file_not_found_in_step(path: PathBuf, step: &str) -> Self {
        Self::FileNotFound {
            help: Some(format!(
                "Required by step '{}'. Check that the file exists.",
                step
            )),
            path,
        }
    }

    /// Create an unknown artifact error listing what is available
    pub fn unknown_artifact(name: &str, known: &[String]) -> Self {
        let help = if known.is_empty() {
            Some("Nothing has been built yet. Run 'svmflow run' first.".to_string())
        } else {
            Some(format!("Built artifacts: {}", known.join(", ")))
        };

        Self::UnknownArtifact {
            name: name.to_string(),
            help,
        }
    }

    /// The innermost error, looking through step attribution
    pub fn root_cause(&self) -> &SvmflowError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_step_names_the_step() {
        let err = SvmflowError::schema("column 'target' not found").in_step("encoded_df");
        let msg = err.to_string();

        assert!(msg.contains("encoded_df"));
        assert!(msg.contains("column 'target' not found"));
        assert!(matches!(err.root_cause(), SvmflowError::Schema { .. }));
    }

    #[test]
    fn test_in_step_does_not_nest() {
        let err = SvmflowError::shape("bad").in_step("a").in_step("b");
        match err {
            SvmflowError::StepFailed { step, .. } => assert_eq!(step, "a"),
            other => panic!("Expected StepFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_dependency_message() {
        let err = SvmflowError::Dependency {
            step: "model".into(),
            dependency: "processed_data".into(),
            reason: DependencyProblem::ForwardReference,
        };
        assert!(err.to_string().contains("forward reference"));
    }

    #[test]
    fn test_unknown_artifact_lists_known_names() {
        let err = SvmflowError::unknown_artifact("nope", &["a".into(), "b".into()]);
        match err {
            SvmflowError::UnknownArtifact { help, .. } => {
                assert_eq!(help.as_deref(), Some("Built artifacts: a, b"));
            }
            other => panic!("Expected UnknownArtifact, got {:?}", other),
        }
    }
}
