// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Factor re-typing and the confusion matrix

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{SvmflowError, SvmflowResult};
use crate::frame::{Column, ColumnData, DataFrame};

use super::metrics;

pub const TRUTH_COLUMN: &str = "truth";
pub const ESTIMATE_COLUMN: &str = "estimate";

/// Counts of predictions against truth over a shared level set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub levels: Vec<String>,
    /// `counts[prediction][truth]`
    pub counts: Vec<Vec<u64>>,
    /// Share of rows on the diagonal
    pub accuracy: f64,
}

impl ConfusionMatrix {
    /// (rows, columns)
    pub fn dims(&self) -> (usize, usize) {
        (
            self.counts.len(),
            self.counts.first().map(Vec::len).unwrap_or(0),
        )
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn get(&self, prediction: usize, truth: usize) -> u64 {
        self.counts
            .get(prediction)
            .and_then(|row| row.get(truth))
            .copied()
            .unwrap_or(0)
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .levels
            .iter()
            .map(String::len)
            .chain(self.counts.iter().flatten().map(|c| c.to_string().len()))
            .chain(["Prediction".len()])
            .max()
            .unwrap_or(1);

        write!(f, "{:>width$}", "Prediction", width = width)?;
        writeln!(f, "  Truth")?;
        write!(f, "{:>width$}", "", width = width)?;
        for level in &self.levels {
            write!(f, " {:>width$}", level, width = width)?;
        }
        writeln!(f)?;

        for (level, row) in self.levels.iter().zip(&self.counts) {
            write!(f, "{:>width$}", level, width = width)?;
            for count in row {
                write!(f, " {:>width$}", count, width = width)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Accuracy: {:.4}", self.accuracy)
    }
}

/// Re-type `truth` and `estimate` as factors over the sorted union of their
/// values, so both columns share one level set
pub fn factorize_evaluation(df: &DataFrame) -> SvmflowResult<DataFrame> {
    let truth = cells(df, TRUTH_COLUMN)?;
    let estimate = cells(df, ESTIMATE_COLUMN)?;

    let mut levels: Vec<String> = truth.iter().chain(&estimate).cloned().collect();
    sort_levels(&mut levels);
    levels.dedup();

    let code = |values: &[String]| -> Vec<u32> {
        values
            .iter()
            .map(|v| levels.iter().position(|l| l == v).unwrap_or(0) as u32)
            .collect()
    };
    let truth_codes = code(&truth);
    let estimate_codes = code(&estimate);

    let columns = df
        .columns()
        .into_iter()
        .map(|column| match column.name.as_str() {
            TRUTH_COLUMN => Column::factor(TRUTH_COLUMN, levels.clone(), truth_codes.clone()),
            ESTIMATE_COLUMN => {
                Column::factor(ESTIMATE_COLUMN, levels.clone(), estimate_codes.clone())
            }
            _ => column,
        })
        .collect();

    DataFrame::new(columns)
}

fn cells(df: &DataFrame, name: &str) -> SvmflowResult<Vec<String>> {
    let column = df.require(name)?;
    Ok((0..column.len()).map(|row| column.cell(row)).collect())
}

/// Numeric order when every level is a number, lexicographic otherwise
fn sort_levels(levels: &mut [String]) {
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    match numeric {
        Some(_) => levels.sort_by(|a, b| {
            let (a, b) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
            a.total_cmp(&b)
        }),
        None => levels.sort(),
    }
}

/// Cross-tabulate the factor columns `estimate` (rows) and `truth` (columns)
pub fn confusion_matrix(df: &DataFrame) -> SvmflowResult<ConfusionMatrix> {
    let (truth_levels, truth) = factor(df, TRUTH_COLUMN)?;
    let (estimate_levels, estimate) = factor(df, ESTIMATE_COLUMN)?;

    if truth_levels != estimate_levels {
        return Err(SvmflowError::schema(format!(
            "'{}' and '{}' have different levels ({} vs {})",
            TRUTH_COLUMN,
            ESTIMATE_COLUMN,
            truth_levels.join(", "),
            estimate_levels.join(", ")
        )));
    }

    let n = truth_levels.len();
    let mut counts = vec![vec![0u64; n]; n];
    for (e, t, count) in df.code_pair_counts(ESTIMATE_COLUMN, TRUTH_COLUMN)? {
        if let Some(cell) = counts
            .get_mut(e as usize)
            .and_then(|row| row.get_mut(t as usize))
        {
            *cell += count;
        }
    }

    let truth: Vec<i64> = truth.iter().map(|&c| i64::from(c)).collect();
    let estimate: Vec<i64> = estimate.iter().map(|&c| i64::from(c)).collect();
    let accuracy = if truth.is_empty() {
        0.0
    } else {
        metrics::accuracy(&truth, &estimate)?
    };

    Ok(ConfusionMatrix {
        levels: truth_levels,
        counts,
        accuracy,
    })
}

fn factor(df: &DataFrame, name: &str) -> SvmflowResult<(Vec<String>, Vec<u32>)> {
    match df.require(name)?.data {
        ColumnData::Factor { levels, codes } => Ok((levels, codes)),
        _ => Err(SvmflowError::schema(format!(
            "column '{}' is not a factor; run factorize_evaluation first",
            name
        ))),
    }
}
