// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Step runners
//!
//! One runner per runtime. The engine invokes every runner the same way:
//! a transform, its positional input artifacts and a step context in, one
//! artifact out.

mod ds;
mod stats;

pub use ds::DataScienceRunner;
pub use stats::StatsRunner;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::artifact::Artifact;
use crate::errors::{SvmflowError, SvmflowResult};
use crate::pipeline::Runtime;
use crate::transforms::{StepContext, Transform};

/// Trait for runtime step runners
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Runtime this runner serves
    fn runtime(&self) -> Runtime;

    /// Run one transform to completion
    async fn run(
        &self,
        transform: &Transform,
        inputs: Vec<Arc<Artifact>>,
        ctx: StepContext,
    ) -> SvmflowResult<Artifact>;

    /// Check that a transform belongs to this runner's runtime
    fn check_transform(&self, step: &str, transform: &Transform) -> SvmflowResult<()> {
        if transform.runtime() != self.runtime() {
            return Err(SvmflowError::InvalidStep {
                step: step.to_string(),
                reason: format!(
                    "{} runs in the '{}' runtime, not '{}'",
                    transform.name(),
                    transform.runtime(),
                    self.runtime()
                ),
            });
        }
        Ok(())
    }
}

/// Run a transform on the blocking pool; transforms are CPU-bound and do
/// synchronous file IO
async fn run_blocking(
    transform: &Transform,
    inputs: Vec<Arc<Artifact>>,
    ctx: StepContext,
) -> SvmflowResult<Artifact> {
    tokio::fs::create_dir_all(&ctx.output_dir).await?;

    let transform = transform.clone();
    let step = ctx.step.clone();
    tokio::task::spawn_blocking(move || transform.apply(&inputs, &ctx))
        .await
        .map_err(|e| SvmflowError::InvalidStep {
            step,
            reason: format!("worker stopped unexpectedly: {}", e),
        })?
}

/// Create the standard runner set, one per runtime
pub fn create_default_runners() -> HashMap<Runtime, Box<dyn StepRunner>> {
    let mut runners: HashMap<Runtime, Box<dyn StepRunner>> = HashMap::new();
    runners.insert(Runtime::Ds, Box::new(DataScienceRunner::new()));
    runners.insert(Runtime::Stats, Box::new(StatsRunner::new()));
    runners
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_runtime_has_a_runner() {
        let runners = create_default_runners();
        for runtime in [Runtime::Ds, Runtime::Stats] {
            assert_eq!(runners[&runtime].runtime(), runtime);
        }
    }
}
