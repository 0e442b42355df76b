// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Classification scores computed with linfa

use linfa::prelude::*;
use ndarray::{Array1, Array2};
use std::collections::BTreeSet;

use crate::errors::{SvmflowError, SvmflowResult};

/// Share of `predicted` equal to `truth`, read off linfa's confusion matrix.
/// Labels are mapped to their index in the sorted union of both slices.
pub(crate) fn accuracy(truth: &[i64], predicted: &[i64]) -> SvmflowResult<f64> {
    if truth.len() != predicted.len() {
        return Err(SvmflowError::shape(format!(
            "{} truth labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(SvmflowError::shape("accuracy of an empty label set"));
    }

    let labels: Vec<i64> = truth
        .iter()
        .chain(predicted)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index = |values: &[i64]| -> Array1<usize> {
        values
            .iter()
            .map(|v| labels.binary_search(v).unwrap_or(0))
            .collect()
    };

    let dataset = Dataset::new(Array2::<f64>::zeros((truth.len(), 1)), index(truth));
    let cm = index(predicted)
        .confusion_matrix(&dataset)
        .map_err(|e| SvmflowError::shape(format!("confusion matrix: {}", e)))?;

    Ok(f64::from(cm.accuracy()))
}
