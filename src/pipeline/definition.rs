// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for .svmflow.yaml files (TOML is accepted too).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::bridge::CodecKind;
use crate::svm::SvmParams;
use crate::transforms::Transform;
use crate::SvmflowError;

/// Default pipeline file name
pub const DEFAULT_PIPELINE_FILE: &str = ".svmflow.yaml";

/// Pipeline definition from .svmflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Parameters shared by every step
    #[serde(default)]
    pub settings: Settings,

    /// Artifact store configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Steps in declaration order
    pub steps: Vec<Step>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Pipeline {
    /// Load a pipeline, choosing the format by extension (`.toml` or YAML)
    pub fn from_file(path: &Path) -> Result<Self, SvmflowError> {
        if !path.exists() {
            return Err(SvmflowError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| SvmflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, SvmflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse pipeline from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, SvmflowError> {
        toml::from_str(toml).map_err(Into::into)
    }

    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> Result<String, SvmflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a step by name
    pub fn get_step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Dataset files read by the pipeline, resolved against `base_dir`
    pub fn source_files(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.steps
            .iter()
            .flat_map(|s| s.transform.source_files(base_dir))
            .collect()
    }
}

/// A single pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step name; also the name of the artifact it produces
    pub name: String,

    /// Step description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Runtime that executes the transform
    pub runtime: Runtime,

    /// Transform to apply
    pub transform: Transform,

    /// Upstream steps, passed to the transform positionally in this order
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Codec that turns this step's artifact into bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<CodecKind>,

    /// Codec that turns cross-runtime inputs back into artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoder: Option<CodecKind>,
}

/// Function set a step runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    /// Data-science functions: loading, encoding, modelling, plotting
    Ds,
    /// Statistical functions: factors and the confusion matrix
    Stats,
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ds => write!(f, "ds"),
            Self::Stats => write!(f, "stats"),
        }
    }
}

/// Parameters shared by every step; part of every cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the binary label column
    #[serde(default = "default_target_column")]
    pub target_column: String,

    /// Seed for the stratified split
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Classifier hyperparameters
    #[serde(default)]
    pub svm: SvmParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_column: default_target_column(),
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            svm: SvmParams::default(),
        }
    }
}

fn default_target_column() -> String {
    "target".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_test_fraction() -> f64 {
    0.3
}

/// Artifact store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Look up previously built artifacts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Store directory, relative to the pipeline file
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".svmflow/store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_pipeline() {
        let yaml = r#"
version: "1"
name: "heart"
steps:
  - name: raw_df
    runtime: ds
    transform:
      type: read_dataset
      path: heart.csv
  - name: encoded_df
    runtime: ds
    transform:
      type: encode_categoricals
    depends_on: [raw_df]
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.name, "heart");
        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.steps[1].depends_on, vec!["raw_df"]);
        assert_eq!(pipeline.settings, Settings::default());
        assert!(pipeline.cache.enabled);
    }

    #[test]
    fn test_parse_codecs_and_settings() {
        let yaml = r#"
name: "bridge"
settings:
  target_column: outcome
  seed: 7
  svm:
    c: 2.0
steps:
  - name: evaluation_df
    runtime: ds
    transform:
      type: make_evaluation_df
    depends_on: [processed_data, y_pred]
    encoder: csv
  - name: factored
    runtime: stats
    transform:
      type: factorize_evaluation
    depends_on: [evaluation_df]
    decoder: csv
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.settings.target_column, "outcome");
        assert_eq!(pipeline.settings.seed, 7);
        assert_eq!(pipeline.settings.test_fraction, 0.3);
        assert_eq!(pipeline.settings.svm.c, 2.0);
        assert_eq!(pipeline.steps[0].encoder, Some(CodecKind::Csv));
        assert_eq!(pipeline.steps[1].decoder, Some(CodecKind::Csv));
        assert_eq!(pipeline.steps[1].runtime, Runtime::Stats);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
name = "heart"

[cache]
enabled = false

[[steps]]
name = "raw_df"
runtime = "ds"
transform = { type = "read_dataset", path = "heart.csv" }
"#;

        let pipeline = Pipeline::from_toml(toml).unwrap();
        assert_eq!(pipeline.steps[0].name, "raw_df");
        assert!(!pipeline.cache.enabled);
        assert_eq!(pipeline.cache.directory, PathBuf::from(".svmflow/store"));
    }

    #[test]
    fn test_unknown_runtime_is_rejected() {
        let yaml = r#"
name: "x"
steps:
  - name: a
    runtime: python
    transform:
      type: encode_categoricals
"#;
        assert!(Pipeline::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let err = Pipeline::from_file(&temp.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, SvmflowError::PipelineNotFound { .. }));
    }

    #[test]
    fn test_round_trip_yaml() {
        let pipeline = Pipeline {
            version: "1".into(),
            name: "test".into(),
            description: Some("A test pipeline".into()),
            settings: Settings::default(),
            cache: CacheConfig::default(),
            steps: vec![Step {
                name: "raw_df".into(),
                description: None,
                runtime: Runtime::Ds,
                transform: Transform::ReadDataset {
                    path: PathBuf::from("heart.csv"),
                },
                depends_on: vec![],
                encoder: None,
                decoder: None,
            }],
        };

        let yaml = pipeline.to_yaml().unwrap();
        let parsed = Pipeline::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.name, pipeline.name);
        assert_eq!(parsed.steps, pipeline.steps);
    }
}
