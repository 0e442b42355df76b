// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Transform registry
//!
//! Every transform a pipeline can declare is a variant of [`Transform`]. Each
//! has a fixed [`Signature`]: the runtime that executes it, the artifact kinds
//! it takes (positionally, in `depends_on` order) and the kind it returns.
//! Validation checks declared steps against these signatures before anything
//! runs.

mod encode;
mod evaluate;
mod files;
mod metrics;
mod model;
mod preprocess;

pub use encode::{encode_categoricals, MISSING_CODE};
pub use evaluate::{
    confusion_matrix, factorize_evaluation, ConfusionMatrix, ESTIMATE_COLUMN, TRUTH_COLUMN,
};
pub use files::copy_file;
pub use model::{compute_accuracy, make_evaluation_df, predict_labels, train_svm_rbf};
pub use preprocess::{holdout_size, make_processed_data, ProcessedData, StandardScaler};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactKind};
use crate::errors::{SvmflowError, SvmflowResult};
use crate::frame::read_csv;
use crate::pipeline::{Runtime, Settings};
use crate::plot;

/// Static shape of a transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub runtime: Runtime,
    pub inputs: &'static [ArtifactKind],
    pub output: ArtifactKind,
}

impl Signature {
    const fn new(runtime: Runtime, inputs: &'static [ArtifactKind], output: ArtifactKind) -> Self {
        Self {
            runtime,
            inputs,
            output,
        }
    }
}

/// Everything a transform may know besides its inputs
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Name of the step being run
    pub step: String,
    pub settings: Settings,
    /// Directory relative paths in the pipeline resolve against
    pub base_dir: PathBuf,
    /// Scratch directory owned by this step for rendered files
    pub output_dir: PathBuf,
}

impl StepContext {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Path for a file this step renders
    pub fn output_file(&self, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.step, extension))
    }
}

/// A declarable transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    /// Load the dataset CSV
    ReadDataset { path: PathBuf },
    EncodeCategoricals,
    TargetDistributionPlot,
    CorrelationHeatmap,
    MakeProcessedData,
    TrainSvmRbf,
    PredictLabels,
    ComputeAccuracy,
    MakeEvaluationDf,
    FactorizeEvaluation,
    ConfusionMatrix,
    ConfusionMatrixPlot,
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadDataset { .. } => "read_dataset",
            Self::EncodeCategoricals => "encode_categoricals",
            Self::TargetDistributionPlot => "target_distribution_plot",
            Self::CorrelationHeatmap => "correlation_heatmap",
            Self::MakeProcessedData => "make_processed_data",
            Self::TrainSvmRbf => "train_svm_rbf",
            Self::PredictLabels => "predict_labels",
            Self::ComputeAccuracy => "compute_accuracy",
            Self::MakeEvaluationDf => "make_evaluation_df",
            Self::FactorizeEvaluation => "factorize_evaluation",
            Self::ConfusionMatrix => "confusion_matrix",
            Self::ConfusionMatrixPlot => "confusion_matrix_plot",
        }
    }

    pub fn signature(&self) -> Signature {
        use ArtifactKind::*;
        use Runtime::{Ds, Stats};

        match self {
            Self::ReadDataset { .. } => Signature::new(Ds, &[], Frame),
            Self::EncodeCategoricals => Signature::new(Ds, &[Frame], Frame),
            Self::TargetDistributionPlot => Signature::new(Ds, &[Frame], File),
            Self::CorrelationHeatmap => Signature::new(Ds, &[Frame], File),
            Self::MakeProcessedData => Signature::new(Ds, &[Frame], Processed),
            Self::TrainSvmRbf => Signature::new(Ds, &[Processed], Model),
            Self::PredictLabels => Signature::new(Ds, &[Model, Processed], Labels),
            Self::ComputeAccuracy => Signature::new(Ds, &[Processed, Labels], Scalar),
            Self::MakeEvaluationDf => Signature::new(Ds, &[Processed, Labels], Frame),
            Self::FactorizeEvaluation => Signature::new(Stats, &[Frame], Frame),
            Self::ConfusionMatrix => Signature::new(Stats, &[Frame], Confusion),
            Self::ConfusionMatrixPlot => Signature::new(Stats, &[Confusion], File),
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.signature().runtime
    }

    /// Files outside the pipeline whose contents this transform reads
    pub fn source_files(&self, base_dir: &Path) -> Vec<PathBuf> {
        match self {
            Self::ReadDataset { path } if path.is_absolute() => vec![path.clone()],
            Self::ReadDataset { path } => vec![base_dir.join(path)],
            _ => Vec::new(),
        }
    }

    /// Run the transform on its positional inputs
    pub fn apply(&self, inputs: &[Arc<Artifact>], ctx: &StepContext) -> SvmflowResult<Artifact> {
        let expected = self.signature().inputs.len();
        if inputs.len() != expected {
            return Err(SvmflowError::InvalidStep {
                step: ctx.step.clone(),
                reason: format!(
                    "{} takes {} input(s), got {}",
                    self.name(),
                    expected,
                    inputs.len()
                ),
            });
        }

        let settings = &ctx.settings;
        let artifact = match self {
            Self::ReadDataset { path } => {
                let path = ctx.resolve(path);
                if !path.exists() {
                    return Err(SvmflowError::file_not_found_in_step(path, &ctx.step));
                }
                Artifact::Frame(read_csv(&path)?)
            }
            Self::EncodeCategoricals => Artifact::Frame(encode_categoricals(
                inputs[0].as_frame()?,
                &settings.target_column,
            )?),
            Self::TargetDistributionPlot => Artifact::File(plot::target_distribution_plot(
                inputs[0].as_frame()?,
                &settings.target_column,
                &ctx.output_file("png"),
            )?),
            Self::CorrelationHeatmap => Artifact::File(plot::correlation_heatmap(
                inputs[0].as_frame()?,
                &ctx.output_file("png"),
            )?),
            Self::MakeProcessedData => Artifact::Processed(make_processed_data(
                inputs[0].as_frame()?,
                &settings.target_column,
                settings.test_fraction,
                settings.seed,
            )?),
            Self::TrainSvmRbf => {
                Artifact::Model(train_svm_rbf(inputs[0].as_processed()?, &settings.svm)?)
            }
            Self::PredictLabels => Artifact::Labels(predict_labels(
                inputs[0].as_model()?,
                inputs[1].as_processed()?,
            )?),
            Self::ComputeAccuracy => Artifact::Scalar(compute_accuracy(
                inputs[0].as_processed()?,
                inputs[1].as_labels()?,
            )?),
            Self::MakeEvaluationDf => Artifact::Frame(make_evaluation_df(
                inputs[0].as_processed()?,
                inputs[1].as_labels()?,
            )?),
            Self::FactorizeEvaluation => {
                Artifact::Frame(factorize_evaluation(inputs[0].as_frame()?)?)
            }
            Self::ConfusionMatrix => Artifact::Confusion(confusion_matrix(inputs[0].as_frame()?)?),
            Self::ConfusionMatrixPlot => {
                let rendered = plot::plot_confusion_matrix(inputs[0].as_confusion()?)?;
                Artifact::File(plot::save_confusion_plot(
                    &rendered,
                    &ctx.output_file("png"),
                )?)
            }
        };

        Ok(artifact)
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadDataset { path } => write!(f, "read_dataset({})", path.display()),
            other => write!(f, "{}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, DataFrame};

    fn context(dir: &Path) -> StepContext {
        StepContext {
            step: "step".into(),
            settings: Settings::default(),
            base_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
        }
    }

    #[test]
    fn test_parse_unit_and_parameterized_variants() {
        let read: Transform = serde_yaml::from_str("type: read_dataset\npath: heart.csv").unwrap();
        assert_eq!(
            read,
            Transform::ReadDataset {
                path: PathBuf::from("heart.csv")
            }
        );

        let encode: Transform = serde_yaml::from_str("type: encode_categoricals").unwrap();
        assert_eq!(encode, Transform::EncodeCategoricals);
    }

    #[test]
    fn test_unknown_transform_is_rejected() {
        assert!(serde_yaml::from_str::<Transform>("type: eval_python").is_err());
    }

    #[test]
    fn test_signatures() {
        let sig = Transform::PredictLabels.signature();
        assert_eq!(sig.runtime, Runtime::Ds);
        assert_eq!(sig.inputs, &[ArtifactKind::Model, ArtifactKind::Processed]);
        assert_eq!(sig.output, ArtifactKind::Labels);

        assert_eq!(Transform::ConfusionMatrix.runtime(), Runtime::Stats);
    }

    #[test]
    fn test_apply_checks_arity() {
        let temp = tempfile::tempdir().unwrap();
        let result = Transform::EncodeCategoricals.apply(&[], &context(temp.path()));
        assert!(matches!(result, Err(SvmflowError::InvalidStep { .. })));
    }

    #[test]
    fn test_apply_read_dataset_resolves_relative_path() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("heart.csv"), "age,target\n50,1\n60,0\n").unwrap();

        let transform = Transform::ReadDataset {
            path: PathBuf::from("heart.csv"),
        };
        let artifact = transform.apply(&[], &context(temp.path())).unwrap();
        assert_eq!(artifact.as_frame().unwrap().n_rows(), 2);
    }

    #[test]
    fn test_apply_rejects_wrong_input_kind() {
        let temp = tempfile::tempdir().unwrap();
        let input = Arc::new(Artifact::Scalar(1.0));
        let result = Transform::EncodeCategoricals.apply(&[input], &context(temp.path()));
        assert!(matches!(result, Err(SvmflowError::Schema { .. })));
    }

    #[test]
    fn test_apply_plot_writes_into_output_dir() {
        let temp = tempfile::tempdir().unwrap();
        let df = DataFrame::new(vec![
            Column::numeric("age", vec![50.0, 60.0]),
            Column::numeric("target", vec![0.0, 1.0]),
        ])
        .unwrap();

        let artifact = Transform::CorrelationHeatmap
            .apply(&[Arc::new(Artifact::Frame(df))], &context(temp.path()))
            .unwrap();

        let path = artifact.as_file().unwrap();
        assert_eq!(path, &temp.path().join("out/step.png"));
        assert!(path.exists());
    }
}
