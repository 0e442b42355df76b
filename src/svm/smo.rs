// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Sequential Minimal Optimization (SMO) solver
//!
//! Solves the C-SVC dual
//!
//! ```text
//! min ½ αᵀQα − eᵀα   s.t.  0 ≤ αᵢ ≤ C,  yᵀα = 0,   Qᵢⱼ = yᵢ yⱼ K(xᵢ, xⱼ)
//! ```
//!
//! two multipliers at a time, choosing the pair by maximal violation for the
//! first index and second-order gain for the second. Selection ties resolve
//! to the highest index, so the solver is fully deterministic.

use crate::errors::{SvmflowError, SvmflowResult};

/// Curvature floor for non-positive-definite pairs
const TAU: f64 = 1e-12;

/// Result of a solve
#[derive(Debug, Clone)]
pub struct Solution {
    /// Lagrange multipliers
    pub alpha: Vec<f64>,
    /// Decision function is Σ αᵢ yᵢ K(xᵢ, x) − rho
    pub rho: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// SMO solver over a precomputed Gram matrix
pub struct SmoSolver<'a> {
    /// Row-major n×n kernel matrix
    gram: &'a [f64],
    /// Labels in {-1, +1}
    y: &'a [f64],
    c: f64,
    tolerance: f64,
    max_iterations: usize,
}

impl<'a> SmoSolver<'a> {
    pub fn new(
        gram: &'a [f64],
        y: &'a [f64],
        c: f64,
        tolerance: f64,
        max_iterations: usize,
    ) -> SvmflowResult<Self> {
        let n = y.len();
        if n == 0 {
            return Err(SvmflowError::Training {
                message: "no training samples".into(),
            });
        }
        if gram.len() != n * n {
            return Err(SvmflowError::shape(format!(
                "kernel matrix has {} entries, expected {}x{}",
                gram.len(),
                n,
                n
            )));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 1.0 && v != -1.0) {
            return Err(SvmflowError::Training {
                message: format!("labels must be -1 or +1, got {}", bad),
            });
        }
        if !(c.is_finite() && c > 0.0) {
            return Err(SvmflowError::Training {
                message: format!("C must be positive, got {}", c),
            });
        }

        Ok(Self {
            gram,
            y,
            c,
            tolerance,
            max_iterations,
        })
    }

    fn k(&self, i: usize, j: usize) -> f64 {
        self.gram[i * self.y.len() + j]
    }

    fn q(&self, i: usize, j: usize) -> f64 {
        self.y[i] * self.y[j] * self.k(i, j)
    }

    fn is_upper_bound(&self, alpha: f64) -> bool {
        alpha >= self.c
    }

    fn is_lower_bound(alpha: f64) -> bool {
        alpha <= 0.0
    }

    /// Run SMO to convergence or the iteration cap
    pub fn solve(&self) -> Solution {
        let n = self.y.len();
        let mut alpha = vec![0.0; n];
        // Gradient of the dual objective; starts at -e since α = 0
        let mut grad = vec![-1.0; n];

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            let Some((i, j)) = self.select_working_set(&alpha, &grad) else {
                converged = true;
                break;
            };
            iterations += 1;

            let (old_i, old_j) = (alpha[i], alpha[j]);
            self.update_pair(i, j, grad[i], grad[j], &mut alpha);

            let delta_i = alpha[i] - old_i;
            let delta_j = alpha[j] - old_j;
            for (k, g) in grad.iter_mut().enumerate() {
                *g += self.q(i, k) * delta_i + self.q(j, k) * delta_j;
            }
        }

        let rho = self.calculate_rho(&alpha, &grad);

        Solution {
            alpha,
            rho,
            iterations,
            converged,
        }
    }

    /// Pick the maximal-violating pair, or `None` once the KKT gap is within
    /// tolerance
    fn select_working_set(&self, alpha: &[f64], grad: &[f64]) -> Option<(usize, usize)> {
        let n = self.y.len();

        let mut g_max = f64::NEG_INFINITY;
        let mut i_sel = None;
        for t in 0..n {
            let candidate = if self.y[t] > 0.0 {
                (!self.is_upper_bound(alpha[t])).then(|| -grad[t])
            } else {
                (!Self::is_lower_bound(alpha[t])).then(|| grad[t])
            };
            if let Some(value) = candidate {
                if value >= g_max {
                    g_max = value;
                    i_sel = Some(t);
                }
            }
        }
        let i = i_sel?;

        let mut g_max2 = f64::NEG_INFINITY;
        let mut j_sel = None;
        let mut obj_diff_min = f64::INFINITY;
        for t in 0..n {
            let (value, grad_diff, quad) = if self.y[t] > 0.0 {
                if Self::is_lower_bound(alpha[t]) {
                    continue;
                }
                (
                    grad[t],
                    g_max + grad[t],
                    self.k(i, i) + self.k(t, t) - 2.0 * self.y[i] * self.q(i, t),
                )
            } else {
                if self.is_upper_bound(alpha[t]) {
                    continue;
                }
                (
                    -grad[t],
                    g_max - grad[t],
                    self.k(i, i) + self.k(t, t) + 2.0 * self.y[i] * self.q(i, t),
                )
            };

            if value >= g_max2 {
                g_max2 = value;
            }
            if grad_diff > 0.0 {
                let quad = if quad > 0.0 { quad } else { TAU };
                let obj_diff = -(grad_diff * grad_diff) / quad;
                if obj_diff <= obj_diff_min {
                    obj_diff_min = obj_diff;
                    j_sel = Some(t);
                }
            }
        }

        if g_max + g_max2 < self.tolerance {
            return None;
        }
        j_sel.map(|j| (i, j))
    }

    /// Analytically optimize the pair (i, j), clipping to the box
    fn update_pair(&self, i: usize, j: usize, grad_i: f64, grad_j: f64, alpha: &mut [f64]) {
        let c = self.c;

        if self.y[i] != self.y[j] {
            let quad = self.k(i, i) + self.k(j, j) + 2.0 * self.q(i, j);
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (-grad_i - grad_j) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let quad = self.k(i, i) + self.k(j, j) - 2.0 * self.q(i, j);
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (grad_i - grad_j) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }
    }

    fn calculate_rho(&self, alpha: &[f64], grad: &[f64]) -> f64 {
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_count = 0usize;
        let mut free_sum = 0.0;

        for (t, (&a, &g)) in alpha.iter().zip(grad).enumerate() {
            let yg = self.y[t] * g;
            if self.is_upper_bound(a) {
                if self.y[t] < 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else if Self::is_lower_bound(a) {
                if self.y[t] > 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else {
                free_count += 1;
                free_sum += yg;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            (upper + lower) / 2.0
        }
    }
}
