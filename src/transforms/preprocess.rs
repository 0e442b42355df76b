// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Feature scaling and the stratified holdout split

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{SvmflowError, SvmflowResult};
use crate::frame::{ColumnData, DataFrame};

/// Scaled features split into training and holdout partitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedData {
    pub feature_names: Vec<String>,
    pub x_train: Vec<Vec<f64>>,
    pub x_test: Vec<Vec<f64>>,
    pub y_train: Vec<i64>,
    pub y_test: Vec<i64>,
    /// Source row of each training sample
    pub train_rows: Vec<usize>,
    /// Source row of each holdout sample
    pub test_rows: Vec<usize>,
    pub scaler: StandardScaler,
}

/// Per-feature standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on the named columns of `df` (population standard deviation;
    /// constant columns get scale 1)
    pub fn fit(df: &DataFrame, names: &[String]) -> SvmflowResult<Self> {
        let mut means = Vec::with_capacity(names.len());
        let mut scales = Vec::with_capacity(names.len());

        for name in names {
            let (mean, std) = df.mean_std(name)?;
            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (mean, scale))| (v - mean) / scale)
            .collect()
    }
}

/// Number of holdout rows for `n` samples
pub fn holdout_size(n: usize, test_fraction: f64) -> usize {
    // Guard against 0.3 * 40 landing a hair above 12
    ((test_fraction * n as f64) - 1e-9).ceil().max(0.0) as usize
}

/// Scale every non-target column and hold out a stratified, seeded
/// fraction of the rows for evaluation
pub fn make_processed_data(
    encoded: &DataFrame,
    target_column: &str,
    test_fraction: f64,
    seed: u64,
) -> SvmflowResult<ProcessedData> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SvmflowError::schema(format!(
            "test fraction must be between 0 and 1, got {}",
            test_fraction
        )));
    }

    let labels = target_labels(encoded, target_column)?;

    let classes: BTreeMap<i64, Vec<usize>> =
        labels
            .iter()
            .enumerate()
            .fold(BTreeMap::new(), |mut acc, (row, &label)| {
                acc.entry(label).or_insert_with(Vec::new).push(row);
                acc
            });

    if classes.len() != 2 {
        return Err(SvmflowError::schema(format!(
            "target column '{}' must contain exactly 2 classes; got {}",
            target_column,
            classes.len()
        )));
    }
    if let Some((label, rows)) = classes.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(SvmflowError::schema(format!(
            "class {} of '{}' has only {} row(s); a stratified split needs at least 2",
            label,
            target_column,
            rows.len()
        )));
    }

    let (feature_names, columns) = feature_columns(encoded, target_column)?;
    let scaler = StandardScaler::fit(encoded, &feature_names)?;

    let n = labels.len();
    let n_test = holdout_size(n, test_fraction);
    if n_test == 0 || n_test >= n {
        return Err(SvmflowError::shape(format!(
            "a holdout of {} out of {} rows leaves nothing to train or evaluate on",
            n_test, n
        )));
    }

    let allocation = allocate(&classes, n, n_test);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_rows = Vec::with_capacity(n - n_test);
    let mut test_rows = Vec::with_capacity(n_test);

    for ((_, rows), take) in classes.iter().zip(allocation) {
        let mut shuffled = rows.clone();
        shuffled.shuffle(&mut rng);
        test_rows.extend_from_slice(&shuffled[..take]);
        train_rows.extend_from_slice(&shuffled[take..]);
    }

    train_rows.sort_unstable();
    test_rows.sort_unstable();

    let scaled_row = |row: usize| -> Vec<f64> {
        let raw: Vec<f64> = columns.iter().map(|c| c[row]).collect();
        scaler.transform_row(&raw)
    };

    Ok(ProcessedData {
        feature_names,
        x_train: train_rows.iter().map(|&r| scaled_row(r)).collect(),
        x_test: test_rows.iter().map(|&r| scaled_row(r)).collect(),
        y_train: train_rows.iter().map(|&r| labels[r]).collect(),
        y_test: test_rows.iter().map(|&r| labels[r]).collect(),
        train_rows,
        test_rows,
        scaler,
    })
}

/// Holdout rows per class, proportional to class size (largest remainder)
fn allocate(classes: &BTreeMap<i64, Vec<usize>>, n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = classes
        .values()
        .map(|rows| n_test as f64 * rows.len() as f64 / n as f64)
        .collect();

    let mut take: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut remaining = n_test - take.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });

    for idx in order {
        if remaining == 0 {
            break;
        }
        take[idx] += 1;
        remaining -= 1;
    }

    take
}

fn target_labels(df: &DataFrame, target_column: &str) -> SvmflowResult<Vec<i64>> {
    let column = df.require(target_column)?;
    let values = column.as_f64().ok_or_else(|| {
        SvmflowError::schema(format!(
            "target column '{}' is text; encode it before splitting",
            target_column
        ))
    })?;

    values
        .iter()
        .enumerate()
        .map(|(row, &v)| {
            if v.is_finite() && v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(SvmflowError::schema(format!(
                    "target column '{}' has a non-integer label at row {}",
                    target_column, row
                )))
            }
        })
        .collect()
}

fn feature_columns(
    df: &DataFrame,
    target_column: &str,
) -> SvmflowResult<(Vec<String>, Vec<Vec<f64>>)> {
    let mut names = Vec::new();
    let mut columns = Vec::new();

    for column in df.columns().into_iter().filter(|c| c.name != target_column) {
        if let ColumnData::Text { .. } = column.data {
            return Err(SvmflowError::schema(format!(
                "feature column '{}' is text; run encode_categoricals first",
                column.name
            )));
        }

        let values = column.as_f64().unwrap_or_default();
        if let Some(row) = values.iter().position(|v| v.is_nan()) {
            return Err(SvmflowError::schema(format!(
                "feature column '{}' has a missing value at row {}",
                column.name, row
            )));
        }

        names.push(column.name);
        columns.push(values);
    }

    if names.is_empty() {
        return Err(SvmflowError::schema(format!(
            "no feature columns besides '{}'",
            target_column
        )));
    }

    Ok((names, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;
    use approx::assert_relative_eq;

    fn balanced(n: usize) -> DataFrame {
        DataFrame::new(vec![
            Column::numeric("age", (0..n).map(|i| 30.0 + (i * 7 % 50) as f64).collect()),
            Column::numeric("chol", (0..n).map(|i| 150.0 + (i * 13 % 150) as f64).collect()),
            Column::numeric("target", (0..n).map(|i| (i % 2) as f64).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_sizes_for_forty_rows() {
        let processed = make_processed_data(&balanced(40), "target", 0.3, 42).unwrap();

        assert_eq!(processed.x_train.len(), 28);
        assert_eq!(processed.x_test.len(), 12);
        assert_eq!(processed.y_train.len(), 28);
        assert_eq!(processed.y_test.len(), 12);
        assert_eq!(processed.feature_names, vec!["age", "chol"]);
    }

    #[test]
    fn test_split_is_stratified() {
        let processed = make_processed_data(&balanced(40), "target", 0.3, 42).unwrap();
        let positives = processed.y_test.iter().filter(|&&y| y == 1).count();
        assert_eq!(positives, 6);
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        let a = make_processed_data(&balanced(50), "target", 0.3, 7).unwrap();
        let b = make_processed_data(&balanced(50), "target", 0.3, 7).unwrap();
        let c = make_processed_data(&balanced(50), "target", 0.3, 8).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.test_rows, c.test_rows);
    }

    #[test]
    fn test_partitions_cover_all_rows_once() {
        let processed = make_processed_data(&balanced(33), "target", 0.3, 42).unwrap();
        let mut all: Vec<usize> = processed
            .train_rows
            .iter()
            .chain(&processed.test_rows)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..33).collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_target() {
        let df = DataFrame::new(vec![Column::numeric("age", vec![1.0, 2.0])]).unwrap();
        let result = make_processed_data(&df, "target", 0.3, 42);
        assert!(matches!(result, Err(SvmflowError::Schema { .. })));
    }

    #[test]
    fn test_single_class_fails() {
        let df = DataFrame::new(vec![
            Column::numeric("age", (0..10).map(|i| i as f64).collect()),
            Column::numeric("target", vec![0.0; 10]),
        ])
        .unwrap();

        let err = make_processed_data(&df, "target", 0.3, 42).unwrap_err();
        assert!(err.to_string().contains("exactly 2 classes; got 1"));
    }

    #[test]
    fn test_text_feature_rejected() {
        let df = DataFrame::new(vec![
            Column::text("sex", vec!["M".into(), "F".into(), "M".into(), "F".into()]),
            Column::numeric("target", vec![0.0, 1.0, 0.0, 1.0]),
        ])
        .unwrap();

        let err = make_processed_data(&df, "target", 0.5, 42).unwrap_err();
        assert!(err.to_string().contains("encode_categoricals"));
    }

    #[test]
    fn test_scaler_standardizes() {
        let df = DataFrame::new(vec![
            Column::numeric("a", vec![1.0, 2.0, 3.0]),
            Column::integer("b", vec![5, 5, 5]),
        ])
        .unwrap();
        let scaler = StandardScaler::fit(&df, &["a".to_string(), "b".to_string()]).unwrap();
        assert_relative_eq!(scaler.means[0], 2.0);
        assert_relative_eq!(scaler.scales[0], (2.0f64 / 3.0).sqrt());
        assert_relative_eq!(scaler.scales[1], 1.0);

        let row = scaler.transform_row(&[2.0, 5.0]);
        assert_relative_eq!(row[0], 0.0);
        assert_relative_eq!(row[1], 0.0);
    }

    #[test]
    fn test_holdout_size() {
        assert_eq!(holdout_size(40, 0.3), 12);
        assert_eq!(holdout_size(60, 0.3), 18);
        assert_eq!(holdout_size(41, 0.3), 13);
    }
}
