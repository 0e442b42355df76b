// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Pipeline definitions and execution
//!
//! The declared step list, the dependency graph built from it, static
//! validation and the executor that walks it.

mod dag;
mod definition;
mod executor;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use executor::{
    format_report, ExecutionOptions, PipelineExecutor, PipelineResult, StepOutcome, StepReport,
};
pub use validation::{PipelineValidator, ValidationResult};
