// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Binary RBF-kernel support vector classifier
//!
//! Training is fully deterministic: the SMO solver has no random component,
//! so a given training set and parameter set always yield the same model.

mod kernel;
mod smo;

pub use kernel::RbfKernel;
pub use smo::{SmoSolver, Solution};

use serde::{Deserialize, Serialize};

use crate::errors::{SvmflowError, SvmflowResult};

/// Multipliers at or below this are not support vectors
const ALPHA_EPSILON: f64 = 1e-12;

/// Classifier hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    /// Regularization parameter
    #[serde(default = "default_c")]
    pub c: f64,

    /// Kernel width
    #[serde(default)]
    pub gamma: Gamma,

    /// KKT tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Maximum number of SMO iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

/// RBF kernel width: an explicit value or a heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gamma {
    Value(f64),
    Heuristic(GammaHeuristic),
}

/// `scale` is 1 / (n_features · Var(X_train))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GammaHeuristic {
    Scale,
}

impl Default for Gamma {
    fn default() -> Self {
        Self::Heuristic(GammaHeuristic::Scale)
    }
}

impl std::fmt::Display for Gamma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::Heuristic(GammaHeuristic::Scale) => write!(f, "scale"),
        }
    }
}

fn default_c() -> f64 {
    1.0
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_max_iterations() -> usize {
    100_000
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: default_c(),
            gamma: Gamma::default(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// A trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmModel {
    pub support_vectors: Vec<Vec<f64>>,
    /// αᵢ·yᵢ for each support vector
    pub coefficients: Vec<f64>,
    pub rho: f64,
    pub gamma: f64,
    pub c: f64,
    /// Original label mapped to -1
    pub negative_label: i64,
    /// Original label mapped to +1
    pub positive_label: i64,
    pub iterations: usize,
    pub converged: bool,
}

impl SvmModel {
    /// Fit on rows `x` with labels `y`, which must hold exactly two classes
    pub fn fit(x: &[Vec<f64>], y: &[i64], params: &SvmParams) -> SvmflowResult<Self> {
        if x.len() != y.len() {
            return Err(SvmflowError::shape(format!(
                "{} training rows but {} labels",
                x.len(),
                y.len()
            )));
        }

        let mut classes: Vec<i64> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let &[negative_label, positive_label] = classes.as_slice() else {
            return Err(SvmflowError::Training {
                message: format!(
                    "binary classification needs exactly 2 classes, got {}",
                    classes.len()
                ),
            });
        };

        let kernel = match params.gamma {
            Gamma::Value(gamma) => RbfKernel::new(gamma),
            Gamma::Heuristic(GammaHeuristic::Scale) => RbfKernel::scaled(x),
        }
        .ok_or_else(|| SvmflowError::Training {
            message: "gamma must be positive and the data must have at least one feature".into(),
        })?;

        let signed: Vec<f64> = y
            .iter()
            .map(|&label| if label == positive_label { 1.0 } else { -1.0 })
            .collect();

        let gram = kernel.gram(x);
        let solution = SmoSolver::new(
            &gram,
            &signed,
            params.c,
            params.tolerance,
            params.max_iterations,
        )?
        .solve();

        if !solution.converged {
            tracing::warn!(
                iterations = solution.iterations,
                "SMO stopped at the iteration cap before converging"
            );
        }

        let mut support_vectors = Vec::new();
        let mut coefficients = Vec::new();
        for (idx, &alpha) in solution.alpha.iter().enumerate() {
            if alpha > ALPHA_EPSILON {
                support_vectors.push(x[idx].clone());
                coefficients.push(alpha * signed[idx]);
            }
        }

        Ok(Self {
            support_vectors,
            coefficients,
            rho: solution.rho,
            gamma: kernel.gamma(),
            c: params.c,
            negative_label,
            positive_label,
            iterations: solution.iterations,
            converged: solution.converged,
        })
    }

    fn kernel(&self) -> SvmflowResult<RbfKernel> {
        RbfKernel::new(self.gamma).ok_or_else(|| SvmflowError::Training {
            message: format!("model carries an invalid gamma ({})", self.gamma),
        })
    }

    fn decision(&self, kernel: &RbfKernel, x: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * kernel.compute(sv, x))
            .sum::<f64>()
            - self.rho
    }

    /// Predict original labels for many rows
    pub fn predict(&self, rows: &[Vec<f64>]) -> SvmflowResult<Vec<i64>> {
        let kernel = self.kernel()?;
        let dims = self.support_vectors.first().map(Vec::len);

        rows.iter()
            .map(|row| {
                if let Some(d) = dims.filter(|&d| d != row.len()) {
                    return Err(SvmflowError::shape(format!(
                        "model expects {} features, row has {}",
                        d,
                        row.len()
                    )));
                }
                Ok(if self.decision(&kernel, row) > 0.0 {
                    self.positive_label
                } else {
                    self.negative_label
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<i64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            let offset = i as f64 * 0.05;
            x.push(vec![-1.0 - offset, -1.0 + offset]);
            y.push(0);
            x.push(vec![1.0 + offset, 1.0 - offset]);
            y.push(1);
        }
        (x, y)
    }

    #[test]
    fn test_fit_and_predict_blobs() {
        let (x, y) = two_blobs();
        let model = SvmModel::fit(&x, &y, &SvmParams::default()).unwrap();

        assert!(model.converged);
        assert_eq!(model.negative_label, 0);
        assert_eq!(model.positive_label, 1);
        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(model.predict(&[vec![-2.0, -2.0], vec![2.0, 2.0]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let x = vec![vec![0.0], vec![1.0]];
        let result = SvmModel::fit(&x, &[1, 1], &SvmParams::default());
        assert!(matches!(result, Err(SvmflowError::Training { .. })));
    }

    #[test]
    fn test_length_mismatch() {
        let x = vec![vec![0.0], vec![1.0]];
        let result = SvmModel::fit(&x, &[0], &SvmParams::default());
        assert!(matches!(result, Err(SvmflowError::Shape { .. })));
    }

    #[test]
    fn test_predict_checks_dimensions() {
        let (x, y) = two_blobs();
        let model = SvmModel::fit(&x, &y, &SvmParams::default()).unwrap();
        assert!(model.predict(&[vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_explicit_gamma_is_used() {
        let (x, y) = two_blobs();
        let params = SvmParams {
            gamma: Gamma::Value(0.25),
            ..SvmParams::default()
        };
        let model = SvmModel::fit(&x, &y, &params).unwrap();
        assert_eq!(model.gamma, 0.25);
    }

    #[test]
    fn test_params_defaults_from_yaml() {
        let params: SvmParams = serde_yaml::from_str("c: 2.0").unwrap();
        assert_eq!(params.c, 2.0);
        assert_eq!(params.gamma, Gamma::default());
        assert_eq!(params.max_iterations, 100_000);
    }

    #[test]
    fn test_gamma_forms() {
        let scale: SvmParams = serde_yaml::from_str("gamma: scale").unwrap();
        assert_eq!(scale.gamma, Gamma::Heuristic(GammaHeuristic::Scale));

        let value: SvmParams = serde_yaml::from_str("gamma: 0.5").unwrap();
        assert_eq!(value.gamma, Gamma::Value(0.5));

        assert!(serde_yaml::from_str::<SvmParams>("gamma: auto").is_err());
    }
}
