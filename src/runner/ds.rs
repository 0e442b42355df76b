// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Data-science runner
//!
//! Loading, encoding, preprocessing, the classifier and exploratory plots.

use async_trait::async_trait;
use std::sync::Arc;

use super::{run_blocking, StepRunner};
use crate::artifact::Artifact;
use crate::errors::SvmflowResult;
use crate::pipeline::Runtime;
use crate::transforms::{StepContext, Transform};

/// Runner for the `ds` runtime
pub struct DataScienceRunner;

impl DataScienceRunner {
    /// Create a new data-science runner
    pub fn new() -> Self {
        Self
    }
}

impl Default for DataScienceRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for DataScienceRunner {
    fn runtime(&self) -> Runtime {
        Runtime::Ds
    }

    async fn run(
        &self,
        transform: &Transform,
        inputs: Vec<Arc<Artifact>>,
        ctx: StepContext,
    ) -> SvmflowResult<Artifact> {
        self.check_transform(&ctx.step, transform)?;
        tracing::debug!(step = %ctx.step, transform = transform.name(), "running in ds");
        run_blocking(transform, inputs, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SvmflowError;
    use crate::pipeline::Settings;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> StepContext {
        StepContext {
            step: "raw_df".into(),
            settings: Settings::default(),
            base_dir: temp.path().to_path_buf(),
            output_dir: temp.path().join("scratch"),
        }
    }

    #[tokio::test]
    async fn test_reads_dataset() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("heart.csv"), "age,target\n63,1\n").unwrap();

        let transform = Transform::ReadDataset {
            path: "heart.csv".into(),
        };
        let artifact = DataScienceRunner::new()
            .run(&transform, vec![], context(&temp))
            .await
            .unwrap();

        assert_eq!(artifact.as_frame().unwrap().n_rows(), 1);
    }

    #[tokio::test]
    async fn test_rejects_stats_transforms() {
        let temp = TempDir::new().unwrap();
        let result = DataScienceRunner::new()
            .run(&Transform::ConfusionMatrix, vec![], context(&temp))
            .await;

        assert!(matches!(result, Err(SvmflowError::InvalidStep { .. })));
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let temp = TempDir::new().unwrap();
        let transform = Transform::ReadDataset {
            path: "missing.csv".into(),
        };
        let result = DataScienceRunner::new()
            .run(&transform, vec![], context(&temp))
            .await;

        assert!(matches!(result, Err(SvmflowError::FileNotFound { .. })));
    }
}
