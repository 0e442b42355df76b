// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Pipeline validation
//!
//! Checks a pipeline statically before anything runs: graph shape, transform
//! signatures against declared dependencies, and the encoder/decoder pairs on
//! every edge that crosses runtimes.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use crate::artifact::ArtifactKind;
use crate::errors::SvmflowError;
use crate::pipeline::{DagBuilder, Pipeline, Settings, Step};
use crate::svm::Gamma;

fn step_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| unreachable!("{}", e))
    })
}

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        if pipeline.steps.is_empty() {
            result.add_error("Pipeline has no steps defined");
        }

        for step in &pipeline.steps {
            if !step_name_pattern().is_match(&step.name) {
                result.add_error(&format!(
                    "Step name '{}' must start with a letter or underscore and contain only letters, digits and underscores",
                    step.name
                ));
            }
        }

        // Duplicate names and unresolvable dependencies
        let graph_ok = match DagBuilder::build(pipeline) {
            Ok(_) => true,
            Err(e) => {
                result.add_error(&e.to_string());
                false
            }
        };

        Self::validate_settings(&pipeline.settings, &mut result);

        for (idx, step) in pipeline.steps.iter().enumerate() {
            Self::validate_step(step, &pipeline.steps[..idx], graph_ok, &mut result);
        }

        result
    }

    fn validate_settings(settings: &Settings, result: &mut ValidationResult) {
        if settings.target_column.trim().is_empty() {
            result.add_error("settings.target_column must not be empty");
        }
        if !(settings.test_fraction > 0.0 && settings.test_fraction < 1.0) {
            result.add_error(&format!(
                "settings.test_fraction must be between 0 and 1 (exclusive), got {}",
                settings.test_fraction
            ));
        }
        if !(settings.svm.c > 0.0) {
            result.add_error(&format!("settings.svm.c must be positive, got {}", settings.svm.c));
        }
        if let Gamma::Value(gamma) = settings.svm.gamma {
            if !(gamma > 0.0) {
                result.add_error(&format!("settings.svm.gamma must be positive, got {}", gamma));
            }
        }
        if !(settings.svm.tolerance > 0.0) {
            result.add_error("settings.svm.tolerance must be positive");
        }
        if settings.svm.max_iterations == 0 {
            result.add_error("settings.svm.max_iterations must be at least 1");
        }
    }

    /// Validate a single step against the steps declared before it
    fn validate_step(step: &Step, earlier: &[Step], graph_ok: bool, result: &mut ValidationResult) {
        let signature = step.transform.signature();

        if step.runtime != signature.runtime {
            result.add_error(&format!(
                "Step '{}': {} runs in the '{}' runtime, but the step declares '{}'",
                step.name,
                step.transform.name(),
                signature.runtime,
                step.runtime
            ));
        }

        if step.depends_on.len() != signature.inputs.len() {
            result.add_error(&format!(
                "Step '{}': {} takes {} input(s) ({}), but {} dependencies are declared",
                step.name,
                step.transform.name(),
                signature.inputs.len(),
                describe_kinds(signature.inputs),
                step.depends_on.len()
            ));
        }

        let mut seen = HashSet::new();
        for dep in &step.depends_on {
            if !seen.insert(dep) {
                result.add_warning(&format!(
                    "Step '{}': '{}' is listed more than once in depends_on",
                    step.name, dep
                ));
            }
        }

        if let Some(encoder) = step.encoder {
            if !encoder.encoder().accepts(signature.output) {
                result.add_error(&format!(
                    "Step '{}': encoder '{}' cannot encode a {}",
                    step.name, encoder, signature.output
                ));
            }
        }

        let mut crosses_runtime = false;
        // Position-wise kind checks need every reference resolved
        if graph_ok {
            for (dep_name, expected) in step.depends_on.iter().zip(signature.inputs) {
                let Some(producer) = earlier.iter().find(|s| &s.name == dep_name) else {
                    continue;
                };
                if producer.runtime == step.runtime {
                    Self::check_kind(step, producer, *expected, result);
                } else {
                    crosses_runtime = true;
                    if let Err(e) = Self::check_bridge(step, producer, *expected) {
                        result.add_error(&e.to_string());
                    }
                }
            }
        }

        if step.decoder.is_some() && graph_ok && !crosses_runtime {
            result.add_warning(&format!(
                "Step '{}': decoder is declared but no input crosses runtimes; it will not be used",
                step.name
            ));
        }
    }

    fn check_kind(step: &Step, producer: &Step, expected: ArtifactKind, result: &mut ValidationResult) {
        let produced = producer.transform.signature().output;
        if produced != expected {
            result.add_error(&format!(
                "Step '{}': expects a {} from '{}', which produces a {}",
                step.name, expected, producer.name, produced
            ));
        }
    }

    /// Check the encoder/decoder pair on an edge between runtimes
    fn check_bridge(step: &Step, producer: &Step, expected: ArtifactKind) -> Result<(), SvmflowError> {
        let bridge_error = |reason: String| SvmflowError::Bridge {
            step: step.name.clone(),
            dependency: producer.name.clone(),
            reason,
        };
        let produced = producer.transform.signature().output;

        let encoder = producer.encoder.ok_or_else(|| {
            bridge_error(format!(
                "'{}' runs in '{}' but declares no encoder",
                producer.name, producer.runtime
            ))
        })?;
        if !encoder.encoder().accepts(produced) {
            return Err(bridge_error(format!(
                "encoder '{}' cannot encode a {}",
                encoder, produced
            )));
        }

        let decoder = step.decoder.ok_or_else(|| {
            bridge_error(format!("the step runs in '{}' but declares no decoder", step.runtime))
        })?;
        if !encoder.compatible_with(decoder) {
            return Err(bridge_error(format!(
                "'{}' bytes cannot be read by decoder '{}'",
                encoder, decoder
            )));
        }

        let decoded = decoder.decoder().output_kind().unwrap_or(produced);
        if decoded != expected {
            return Err(bridge_error(format!(
                "decoder '{}' yields a {}, but {} expects a {}",
                decoder,
                decoded,
                step.transform.name(),
                expected
            )));
        }

        Ok(())
    }

    /// Check that dataset files exist (runtime validation)
    pub fn validate_files(pipeline: &Pipeline, base_path: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for step in &pipeline.steps {
            for path in step.transform.source_files(base_path) {
                if !path.exists() {
                    missing.push(format!(
                        "Step '{}': dataset not found: {}",
                        step.name,
                        path.display()
                    ));
                }
            }
        }

        missing
    }
}

fn describe_kinds(kinds: &[ArtifactKind]) -> String {
    if kinds.is_empty() {
        return "none".to_string();
    }
    kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Turn the collected errors into a single pipeline error
    pub fn into_result(self) -> Result<Self, SvmflowError> {
        if self.is_valid() {
            return Ok(self);
        }
        Err(SvmflowError::InvalidPipeline {
            reason: self.errors.join("; "),
            help: Some("Run 'svmflow validate' for the full report".to_string()),
        })
    }
}
