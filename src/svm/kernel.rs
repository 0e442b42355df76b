// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! RBF (Radial Basis Function) kernel
//!
//! K(x, y) = exp(-γ · ||x - y||²)

/// RBF kernel over dense feature vectors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbfKernel {
    gamma: f64,
}

impl RbfKernel {
    /// Create a kernel; `gamma` must be positive and finite
    pub fn new(gamma: f64) -> Option<Self> {
        (gamma.is_finite() && gamma > 0.0).then_some(Self { gamma })
    }

    /// γ = 1 / (n_features · Var(X)), the usual "scale" heuristic. Falls
    /// back to 1 / n_features when the data has no variance.
    pub fn scaled(rows: &[Vec<f64>]) -> Option<Self> {
        let n_features = rows.first().map(Vec::len).filter(|&n| n > 0)?;

        let count = (rows.len() * n_features) as f64;
        let mean = rows.iter().flatten().sum::<f64>() / count;
        let var = rows.iter().flatten().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        if var > 0.0 {
            Self::new(1.0 / (n_features as f64 * var))
        } else {
            Self::new(1.0 / n_features as f64)
        }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        let squared_distance: f64 = x.iter().zip(y).map(|(a, b)| (a - b).powi(2)).sum();
        (-self.gamma * squared_distance).exp()
    }

    /// Full Gram matrix, row-major
    pub fn gram(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let n = rows.len();
        let mut k = vec![0.0; n * n];
        for i in 0..n {
            k[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let value = self.compute(&rows[i], &rows[j]);
                k[i * n + j] = value;
                k[j * n + i] = value;
            }
        }
        k
    }
}
