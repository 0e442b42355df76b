// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Pipeline executor
//!
//! Walks the steps in dependency order. Each step is looked up in the
//! artifact store by its cache key and only run when no complete entry
//! exists. A failing step takes its downstream dependents with it; steps
//! on independent branches still build.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use indicatif::ProgressBar;

use crate::artifact::{Artifact, ArtifactKind};
use crate::cache::{Cache, ContentHasher, StoredArtifact};
use crate::errors::{SvmflowError, SvmflowResult};
use crate::pipeline::{DagBuilder, Pipeline, PipelineValidator, Runtime, Step};
use crate::runner::{create_default_runners, StepRunner};
use crate::transforms::StepContext;

/// Pipeline execution options
#[derive(Clone, Default)]
pub struct ExecutionOptions {
    /// Skip cache lookups; results are still stored
    pub no_cache: bool,
    /// Only plan, run nothing
    pub dry_run: bool,
    /// Only build these steps and what they depend on
    pub targets: Vec<String>,
    /// Progress display, advanced once per step
    pub progress: Option<ProgressBar>,
}

/// What happened to a step
#[derive(Debug)]
pub enum StepOutcome {
    /// The transform ran and its artifact was stored
    Built { key: String },
    /// A complete entry already existed for the key
    Cached { key: String },
    Failed { error: SvmflowError },
    /// Not attempted because `upstream` failed
    Skipped { upstream: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Built { .. } | Self::Cached { .. })
    }

    /// Cache key of the artifact, when one exists
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Built { key } | Self::Cached { key } => Some(key),
            _ => None,
        }
    }
}

/// Outcome of one step
#[derive(Debug)]
pub struct StepReport {
    pub name: String,
    pub outcome: StepOutcome,
    pub duration: Duration,
}

/// Result of executing a pipeline
#[derive(Debug)]
pub struct PipelineResult {
    /// Steps selected for the run, in execution order
    pub plan: Vec<String>,
    /// Per-step reports in execution order; empty for a dry run
    pub steps: Vec<StepReport>,
    /// Total execution time
    pub duration: Duration,
    /// Whether every step was built or cached
    pub success: bool,
}

impl PipelineResult {
    /// Report for a step, if it was part of the run
    pub fn report(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|r| r.name == name)
    }

    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.report(name).map(|r| &r.outcome)
    }

    /// Number of steps served from the store
    pub fn cached_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Cached { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SvmflowError)> {
        self.steps.iter().filter_map(|r| match &r.outcome {
            StepOutcome::Failed { error } => Some((r.name.as_str(), error)),
            _ => None,
        })
    }
}

/// A step that produced an artifact during this run
struct Produced {
    runtime: Runtime,
    stored: StoredArtifact,
    artifact: Arc<Artifact>,
}

/// Pipeline executor
pub struct PipelineExecutor {
    /// Runners by runtime
    runners: HashMap<Runtime, Box<dyn StepRunner>>,
    /// Artifact store
    cache: Arc<dyn Cache>,
}

impl PipelineExecutor {
    /// Create an executor with the standard runner set
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            runners: create_default_runners(),
            cache,
        }
    }

    /// Register (or replace) the runner for its runtime
    pub fn register_runner(&mut self, runner: Box<dyn StepRunner>) {
        self.runners.insert(runner.runtime(), runner);
    }

    /// Execute a pipeline; relative dataset paths resolve against `working_dir`
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        working_dir: &Path,
        options: &ExecutionOptions,
    ) -> SvmflowResult<PipelineResult> {
        let start = Instant::now();

        let dag = DagBuilder::build(pipeline)?;
        let validation = PipelineValidator::validate(pipeline).into_result()?;
        for warning in &validation.warnings {
            tracing::warn!("{}", warning);
        }

        let plan = if options.targets.is_empty() {
            dag.topological_order_names()
        } else {
            dag.closure_of(&options.targets)?
        };
        tracing::info!(pipeline = %pipeline.name, steps = plan.len(), "execution plan ready");

        if options.dry_run {
            return Ok(PipelineResult {
                plan,
                steps: Vec::new(),
                duration: start.elapsed(),
                success: true,
            });
        }

        let mut produced: HashMap<String, Produced> = HashMap::new();
        // Step name -> the failed step that blocked it
        let mut blocked: HashMap<String, String> = HashMap::new();
        let mut reports = Vec::with_capacity(plan.len());

        for name in &plan {
            let step = pipeline.get_step(name).ok_or_else(|| SvmflowError::InvalidPipeline {
                reason: format!("planned step '{}' is not declared", name),
                help: None,
            })?;
            let step_start = Instant::now();
            if let Some(pb) = &options.progress {
                pb.set_message(step.name.clone());
            }

            let upstream = step.depends_on.iter().find_map(|dep| blocked.get(dep).cloned());
            let outcome = match upstream {
                Some(upstream) => {
                    tracing::warn!(step = %step.name, upstream = %upstream, "skipped");
                    blocked.insert(step.name.clone(), upstream.clone());
                    self.forget_quietly(&step.name).await;
                    StepOutcome::Skipped { upstream }
                }
                None => match self
                    .run_step(step, pipeline, working_dir, options, &produced)
                    .await
                {
                    Ok((outcome, result)) => {
                        produced.insert(step.name.clone(), result);
                        outcome
                    }
                    Err(error) => {
                        let error = error.in_step(&step.name);
                        tracing::warn!(step = %step.name, error = %error, "step failed");
                        blocked.insert(step.name.clone(), step.name.clone());
                        self.forget_quietly(&step.name).await;
                        StepOutcome::Failed { error }
                    }
                },
            };

            let report = StepReport {
                name: step.name.clone(),
                outcome,
                duration: step_start.elapsed(),
            };
            if let Some(pb) = &options.progress {
                let line = format_report(&report);
                // A hidden bar (no terminal) swallows println
                if pb.is_hidden() {
                    println!("{}", line);
                } else {
                    pb.println(line);
                }
                pb.inc(1);
            }
            reports.push(report);
        }

        let success = reports.iter().all(|r| r.outcome.is_success());
        let duration = start.elapsed();
        tracing::info!(
            success,
            duration_ms = duration.as_millis() as u64,
            "pipeline finished"
        );

        Ok(PipelineResult {
            plan,
            steps: reports,
            duration,
            success,
        })
    }

    /// Drop a step's stale manifest entry; failing to do so only costs a
    /// stale `show`, so the run goes on
    async fn forget_quietly(&self, name: &str) {
        if let Err(error) = self.cache.forget(name).await {
            tracing::warn!(step = %name, error = %error, "could not drop manifest entry");
        }
    }

    /// Build (or fetch) one step whose dependencies all succeeded
    async fn run_step(
        &self,
        step: &Step,
        pipeline: &Pipeline,
        working_dir: &Path,
        options: &ExecutionOptions,
        produced: &HashMap<String, Produced>,
    ) -> SvmflowResult<(StepOutcome, Produced)> {
        let mut upstream = Vec::with_capacity(step.depends_on.len());
        for dep in &step.depends_on {
            let result = produced.get(dep).ok_or_else(|| SvmflowError::InvalidStep {
                step: step.name.clone(),
                reason: format!("dependency '{}' has not been built", dep),
            })?;
            upstream.push((dep.as_str(), result));
        }

        let dependency_keys: Vec<String> = upstream
            .iter()
            .map(|(_, result)| result.stored.entry.cache_key.clone())
            .collect();
        let key = ContentHasher::new().hash_step(
            step,
            &pipeline.settings,
            &dependency_keys,
            working_dir,
        )?;

        if pipeline.cache.enabled && !options.no_cache {
            match self.cache.get(&key).await {
                Ok(Some(stored)) => {
                    tracing::debug!(step = %step.name, key = %key, "cache hit");
                    self.cache.record(&step.name, &stored).await?;
                    let result = Produced {
                        runtime: step.runtime,
                        artifact: Arc::new(stored.artifact.clone()),
                        stored,
                    };
                    return Ok((StepOutcome::Cached { key }, result));
                }
                Ok(None) => tracing::debug!(step = %step.name, key = %key, "cache miss"),
                Err(e) => {
                    tracing::warn!(step = %step.name, error = %e, "discarding unreadable cache entry");
                    self.cache.invalidate(&key).await?;
                }
            }
        }

        let scratch = self.cache.scratch_dir(&step.name);
        if scratch.exists() {
            tokio::fs::remove_dir_all(&scratch).await?;
        }

        let mut inputs = Vec::with_capacity(upstream.len());
        let expected = step.transform.signature().inputs;
        for ((dep, result), kind) in upstream.iter().zip(expected) {
            if result.runtime == step.runtime {
                inputs.push(Arc::clone(&result.artifact));
            } else {
                let producer = pipeline.get_step(dep).ok_or_else(|| SvmflowError::InvalidStep {
                    step: step.name.clone(),
                    reason: format!("dependency '{}' is not declared", dep),
                })?;
                let artifact = cross_runtime(step, producer, result, *kind, &scratch)?;
                inputs.push(Arc::new(artifact));
            }
        }

        let runner = self
            .runners
            .get(&step.runtime)
            .ok_or_else(|| SvmflowError::InvalidStep {
                step: step.name.clone(),
                reason: format!("no runner is registered for the '{}' runtime", step.runtime),
            })?;

        let ctx = StepContext {
            step: step.name.clone(),
            settings: pipeline.settings.clone(),
            base_dir: working_dir.to_path_buf(),
            output_dir: scratch.clone(),
        };
        let artifact = runner.run(&step.transform, inputs, ctx).await?;

        let stored = self
            .cache
            .store(&step.name, &key, &artifact, step.encoder)
            .await?;
        self.cache.record(&step.name, &stored).await?;
        let short_key = &key[..12.min(key.len())];
        tracing::info!(step = %step.name, key = short_key, "built {}", artifact.kind());

        if scratch.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
                tracing::debug!(step = %step.name, error = %e, "could not remove scratch directory");
            }
        }

        let result = Produced {
            runtime: step.runtime,
            artifact: Arc::new(stored.artifact.clone()),
            stored,
        };
        Ok((StepOutcome::Built { key }, result))
    }
}

/// Hand an artifact from `producer` to `consumer` through their codecs
fn cross_runtime(
    consumer: &Step,
    producer: &Step,
    result: &Produced,
    expected: ArtifactKind,
    scratch: &Path,
) -> SvmflowResult<Artifact> {
    let bridge_error = |reason: String| SvmflowError::Bridge {
        step: consumer.name.clone(),
        dependency: producer.name.clone(),
        reason,
    };

    let encoder = producer
        .encoder
        .ok_or_else(|| bridge_error("the producer declares no encoder".to_string()))?;
    let decoder = consumer
        .decoder
        .ok_or_else(|| bridge_error("the step declares no decoder".to_string()))?;

    // The store already holds the encoder's bytes when it wrote them as the
    // entry's materialized file
    let entry = &result.stored.entry;
    let materialized_codec = entry.handoff.as_ref().map_or(entry.codec, |h| h.codec);
    let bytes = if materialized_codec == encoder {
        let path = result.stored.materialized_path();
        std::fs::read(&path).map_err(|e| SvmflowError::FileReadError {
            path,
            error: e.to_string(),
        })?
    } else {
        encoder.encoder().encode(&result.artifact)?
    };

    let materialize_at: PathBuf = scratch.join("inputs").join(format!(
        "{}.{}",
        producer.name,
        encoder.encoder().extension(&result.artifact)
    ));
    let artifact = decoder.decoder().decode(&bytes, &materialize_at)?;

    if artifact.kind() != expected {
        return Err(bridge_error(format!(
            "decoder '{}' yielded a {}, expected a {}",
            decoder,
            artifact.kind(),
            expected
        )));
    }
    tracing::debug!(
        step = %consumer.name,
        dependency = %producer.name,
        bytes = bytes.len(),
        "bridged {} -> {}",
        encoder,
        decoder
    );

    Ok(artifact)
}

/// One coloured status line for a finished step
pub fn format_report(report: &StepReport) -> String {
    match &report.outcome {
        StepOutcome::Built { .. } => format!(
            "  {} {} ({:.2}s)",
            "✓".green(),
            report.name.bold(),
            report.duration.as_secs_f64()
        ),
        StepOutcome::Cached { .. } => {
            format!("  {} {} {}", "✓".green(), report.name.bold(), "(cached)".dimmed())
        }
        StepOutcome::Failed { error } => format!(
            "  {} {} {}",
            "✗".red(),
            report.name.bold(),
            error.root_cause().to_string().dimmed()
        ),
        StepOutcome::Skipped { upstream } => format!(
            "  {} {} {}",
            "○".dimmed(),
            report.name.dimmed(),
            format!("(skipped: '{}' failed)", upstream).dimmed()
        ),
    }
}
