// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Artifacts produced by pipeline steps
//!
//! An artifact is the immutable output of exactly one step. Steps hand each
//! other artifacts by name; the kind tag is what static validation checks
//! transform signatures against.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{SvmflowError, SvmflowResult};
use crate::frame::DataFrame;
use crate::svm::SvmModel;
use crate::transforms::{ConfusionMatrix, ProcessedData};

/// The materialized output of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Artifact {
    Frame(DataFrame),
    Processed(ProcessedData),
    Model(SvmModel),
    Labels(Vec<i64>),
    Scalar(f64),
    Confusion(ConfusionMatrix),
    /// A rendered file (PNG, CSV) on disk
    File(PathBuf),
}

/// Kind tag of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Frame,
    Processed,
    Model,
    Labels,
    Scalar,
    Confusion,
    File,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Frame => "frame",
            Self::Processed => "processed data",
            Self::Model => "model",
            Self::Labels => "labels",
            Self::Scalar => "scalar",
            Self::Confusion => "confusion matrix",
            Self::File => "file",
        };
        write!(f, "{}", name)
    }
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Frame(_) => ArtifactKind::Frame,
            Self::Processed(_) => ArtifactKind::Processed,
            Self::Model(_) => ArtifactKind::Model,
            Self::Labels(_) => ArtifactKind::Labels,
            Self::Scalar(_) => ArtifactKind::Scalar,
            Self::Confusion(_) => ArtifactKind::Confusion,
            Self::File(_) => ArtifactKind::File,
        }
    }

    pub fn as_frame(&self) -> SvmflowResult<&DataFrame> {
        match self {
            Self::Frame(df) => Ok(df),
            other => Err(other.mismatch(ArtifactKind::Frame)),
        }
    }

    pub fn as_processed(&self) -> SvmflowResult<&ProcessedData> {
        match self {
            Self::Processed(p) => Ok(p),
            other => Err(other.mismatch(ArtifactKind::Processed)),
        }
    }

    pub fn as_model(&self) -> SvmflowResult<&SvmModel> {
        match self {
            Self::Model(m) => Ok(m),
            other => Err(other.mismatch(ArtifactKind::Model)),
        }
    }

    pub fn as_labels(&self) -> SvmflowResult<&[i64]> {
        match self {
            Self::Labels(l) => Ok(l),
            other => Err(other.mismatch(ArtifactKind::Labels)),
        }
    }

    pub fn as_confusion(&self) -> SvmflowResult<&ConfusionMatrix> {
        match self {
            Self::Confusion(c) => Ok(c),
            other => Err(other.mismatch(ArtifactKind::Confusion)),
        }
    }

    pub fn as_file(&self) -> SvmflowResult<&PathBuf> {
        match self {
            Self::File(p) => Ok(p),
            other => Err(other.mismatch(ArtifactKind::File)),
        }
    }

    fn mismatch(&self, expected: ArtifactKind) -> SvmflowError {
        SvmflowError::schema(format!(
            "expected a {} artifact, got a {}",
            expected,
            self.kind()
        ))
    }

    /// One-paragraph human-readable summary
    pub fn summary(&self) -> String {
        match self {
            Self::Frame(df) => {
                let mut out = format!("frame: {} rows x {} columns\n", df.n_rows(), df.n_cols());
                for column in df.columns() {
                    out.push_str(&format!("  {} ({})\n", column.name, column.type_name()));
                }
                out
            }
            Self::Processed(p) => format!(
                "processed data: {} train rows, {} holdout rows, {} features\n",
                p.x_train.len(),
                p.x_test.len(),
                p.feature_names.len()
            ),
            Self::Model(m) => format!(
                "RBF SVM: {} support vectors, gamma = {:.6}, C = {}\n",
                m.support_vectors.len(),
                m.gamma,
                m.c
            ),
            Self::Labels(l) => format!("labels: {} values\n", l.len()),
            Self::Scalar(v) => format!("{}\n", v),
            Self::Confusion(cm) => cm.to_string(),
            Self::File(p) => format!("file: {}\n", p.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_accessors() {
        let artifact = Artifact::Labels(vec![0, 1, 1]);
        assert_eq!(artifact.kind(), ArtifactKind::Labels);
        assert_eq!(artifact.as_labels().unwrap(), &[0, 1, 1]);

        let err = artifact.as_frame().unwrap_err();
        assert!(err.to_string().contains("expected a frame artifact, got a labels"));
    }

    #[test]
    fn test_scalar_summary() {
        assert_eq!(Artifact::Scalar(0.75).summary(), "0.75\n");
    }
}
