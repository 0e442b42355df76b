// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use super::{DependencyProblem, SvmflowError};

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick a suggestion for an error, if one applies
    pub fn for_error(error: &SvmflowError) -> Option<Self> {
        match error.root_cause() {
            SvmflowError::DuplicateName { step } => Some(Self::rename_duplicate(step)),
            SvmflowError::Dependency {
                step,
                dependency,
                reason,
            } => Some(Self::fix_dependency(step, dependency, *reason)),
            SvmflowError::PipelineNotFound { .. } => Some(Self::create_pipeline()),
            SvmflowError::FileNotFound { path, .. } => {
                Some(Self::provide_dataset(&path.display().to_string()))
            }
            SvmflowError::UnknownArtifact { name, .. } => Some(Self::build_artifact(name)),
            _ => None,
        }
    }

    /// Suggest renaming a duplicated step
    pub fn rename_duplicate(step: &str) -> Self {
        Self {
            action: format!("Rename one of the steps called '{}'", step),
            steps: vec![
                "Each step name identifies exactly one artifact".into(),
                "Give the second declaration a distinct name and update its dependents".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest fixing an unresolvable dependency
    pub fn fix_dependency(step: &str, dependency: &str, reason: DependencyProblem) -> Self {
        let first = match reason {
            DependencyProblem::Undeclared => {
                format!("No step named '{}' exists; check for typos", dependency)
            }
            DependencyProblem::ForwardReference => format!(
                "Move '{}' above '{}' in the step list",
                dependency, step
            ),
        };

        Self {
            action: format!("Fix the dependency '{}' of step '{}'", dependency, step),
            steps: vec![
                first,
                "Steps may only depend on steps declared before them".into(),
            ],
            commands: vec![
                "# Inspect the resolved order:".into(),
                "svmflow graph --format text".into(),
            ],
        }
    }

    /// Suggest creating a pipeline file
    pub fn create_pipeline() -> Self {
        Self {
            action: "Create a pipeline configuration".into(),
            steps: vec![
                "No .svmflow.yaml found in current directory".into(),
                "Initialize a new project or create the file manually".into(),
            ],
            commands: vec!["svmflow init".into()],
        }
    }

    /// Suggest providing the dataset a step reads
    pub fn provide_dataset(path: &str) -> Self {
        Self {
            action: format!("Provide the input file '{}'", path),
            steps: vec![
                "The dataset must be a CSV file with a header row".into(),
                "Update the read_dataset step's path if the file lives elsewhere".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest building an artifact before reading it
    pub fn build_artifact(name: &str) -> Self {
        Self {
            action: format!("Build '{}' before reading it", name),
            steps: vec![format!(
                "Check that '{}' is a step in the pipeline and that it succeeded",
                name
            )],
            commands: vec![format!("svmflow run --step {}", name)],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_reference_suggests_reordering() {
        let err = SvmflowError::Dependency {
            step: "b".into(),
            dependency: "c".into(),
            reason: DependencyProblem::ForwardReference,
        };

        let suggestion = RecoverySuggestion::for_error(&err).unwrap();
        assert!(suggestion.steps[0].contains("Move 'c' above 'b'"));
    }

    #[test]
    fn test_no_suggestion_for_shape_errors() {
        let err = SvmflowError::shape("3x3");
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }
}
