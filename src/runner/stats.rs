// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Statistical runner
//!
//! Factor re-typing, the confusion matrix and its plot. Inputs arriving from
//! the `ds` runtime have already been through the bridge.

use async_trait::async_trait;
use std::sync::Arc;

use super::{run_blocking, StepRunner};
use crate::artifact::Artifact;
use crate::errors::SvmflowResult;
use crate::pipeline::Runtime;
use crate::transforms::{StepContext, Transform};

/// Runner for the `stats` runtime
pub struct StatsRunner;

impl StatsRunner {
    /// Create a new statistical runner
    pub fn new() -> Self {
        Self
    }
}

impl Default for StatsRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for StatsRunner {
    fn runtime(&self) -> Runtime {
        Runtime::Stats
    }

    async fn run(
        &self,
        transform: &Transform,
        inputs: Vec<Arc<Artifact>>,
        ctx: StepContext,
    ) -> SvmflowResult<Artifact> {
        self.check_transform(&ctx.step, transform)?;
        tracing::debug!(step = %ctx.step, transform = transform.name(), "running in stats");
        run_blocking(transform, inputs, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, DataFrame};
    use crate::pipeline::Settings;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_confusion_chain() {
        let temp = TempDir::new().unwrap();
        let ctx = |step: &str| StepContext {
            step: step.into(),
            settings: Settings::default(),
            base_dir: temp.path().to_path_buf(),
            output_dir: temp.path().join(step),
        };
        let runner = StatsRunner::new();

        let evaluation = DataFrame::new(vec![
            Column::numeric("truth", vec![0.0, 1.0, 1.0, 0.0]),
            Column::numeric("estimate", vec![0.0, 1.0, 0.0, 0.0]),
        ])
        .unwrap();

        let factored = runner
            .run(
                &Transform::FactorizeEvaluation,
                vec![Arc::new(Artifact::Frame(evaluation))],
                ctx("factored"),
            )
            .await
            .unwrap();
        let cm = runner
            .run(&Transform::ConfusionMatrix, vec![Arc::new(factored)], ctx("cm"))
            .await
            .unwrap();
        assert_eq!(cm.as_confusion().unwrap().total(), 4);

        let plot = runner
            .run(&Transform::ConfusionMatrixPlot, vec![Arc::new(cm)], ctx("cm_plot"))
            .await
            .unwrap();
        assert!(plot.as_file().unwrap().exists());
    }
}
