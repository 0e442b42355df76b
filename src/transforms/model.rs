// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Training, prediction and holdout scoring

use crate::errors::{SvmflowError, SvmflowResult};
use crate::frame::{Column, DataFrame};
use crate::svm::{SvmModel, SvmParams};

use super::evaluate::{ESTIMATE_COLUMN, TRUTH_COLUMN};
use super::{metrics, ProcessedData};

/// Fit an RBF SVM on the training partition
pub fn train_svm_rbf(processed: &ProcessedData, params: &SvmParams) -> SvmflowResult<SvmModel> {
    let model = SvmModel::fit(&processed.x_train, &processed.y_train, params)?;
    tracing::debug!(
        support_vectors = model.support_vectors.len(),
        iterations = model.iterations,
        gamma = model.gamma,
        "trained RBF SVM"
    );
    Ok(model)
}

/// One predicted label per holdout row
pub fn predict_labels(model: &SvmModel, processed: &ProcessedData) -> SvmflowResult<Vec<i64>> {
    model.predict(&processed.x_test)
}

fn check_lengths(truth: &[i64], predicted: &[i64]) -> SvmflowResult<()> {
    if truth.len() != predicted.len() {
        return Err(SvmflowError::shape(format!(
            "{} holdout labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Fraction of holdout rows predicted correctly
pub fn compute_accuracy(processed: &ProcessedData, predicted: &[i64]) -> SvmflowResult<f64> {
    check_lengths(&processed.y_test, predicted)?;
    if predicted.is_empty() {
        return Err(SvmflowError::shape("accuracy of an empty holdout set"));
    }

    metrics::accuracy(&processed.y_test, predicted)
}

/// Two-column table of holdout truth against prediction
pub fn make_evaluation_df(processed: &ProcessedData, predicted: &[i64]) -> SvmflowResult<DataFrame> {
    check_lengths(&processed.y_test, predicted)?;

    DataFrame::new(vec![
        Column::integer(TRUTH_COLUMN, processed.y_test.clone()),
        Column::integer(ESTIMATE_COLUMN, predicted.to_vec()),
    ])
}
