// ============================================================
// Layer 5b — Logistic Regression
// ============================================================
// L2-regularised logistic regression fitted by full-batch
// gradient descent on
//
//   J(w, b) = ||w||² / (2·C·n) + mean_i log(1 + exp(-y_i (w·x_i + b)))
//
// with y_i ∈ {-1, +1}. The intercept is not penalised. The step
// size is 1 / L for the Lipschitz bound
//
//   L = 1 / (C·n) + ¼ · mean_i (||x_i||² + 1)
//
// so every step decreases J. Iteration stops at `max_iter` or
// once the gradient norm drops below `tol`.

use anyhow::{bail, Result};

use crate::domain::features::SparseVector;
use crate::domain::traits::BinaryClassifier;

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Inverse regularisation strength
    pub c:        f64,
    pub max_iter: usize,
    pub tol:      f64,
    weights:      Vec<f64>,
    bias:         f64,
    n_iter:       usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 300, 1e-4)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, tol: f64) -> Self {
        Self { c, max_iter, tol, weights: Vec::new(), bias: 0.0, n_iter: 0 }
    }

    #[cfg(test)]
    pub(crate) fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// P(positive | row)
    #[cfg(test)]
    pub(crate) fn probability(&self, row: &SparseVector) -> f64 {
        sigmoid(self.decision(row))
    }
}

impl BinaryClassifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn fit(&mut self, rows: &[SparseVector], labels: &[u8]) -> Result<()> {
        if rows.len() != labels.len() || rows.is_empty() {
            bail!("need matching non-empty rows and labels ({} vs {})", rows.len(), labels.len());
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            bail!("C must be positive, got {}", self.c);
        }

        let n          = rows.len() as f64;
        let n_features = rows.iter().filter_map(|r| r.entries().last().map(|&(i, _)| i + 1)).max().unwrap_or(0);
        let ys: Vec<f64> = labels.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();

        let reg  = 1.0 / (self.c * n);
        let lips = reg + 0.25 * rows.iter().map(|r| r.squared_norm() + 1.0).sum::<f64>() / n;
        let step = 1.0 / lips;

        self.weights = vec![0.0; n_features];
        self.bias    = 0.0;
        self.n_iter  = 0;

        let mut grad = vec![0.0; n_features];
        for iter in 1..=self.max_iter {
            grad.iter_mut().zip(&self.weights).for_each(|(g, w)| *g = reg * w);
            let mut grad_b = 0.0;

            for (row, &y) in rows.iter().zip(&ys) {
                let margin = y * (row.dot(&self.weights) + self.bias);
                // d/dz log(1 + exp(-y z)) = -y σ(-y z)
                let coef = -y * sigmoid(-margin) / n;
                for &(i, v) in row.entries() {
                    grad[i] += coef * v;
                }
                grad_b += coef;
            }

            let norm = (grad.iter().map(|g| g * g).sum::<f64>() + grad_b * grad_b).sqrt();
            self.n_iter = iter;
            if norm < self.tol {
                break;
            }
            self.weights.iter_mut().zip(&grad).for_each(|(w, g)| *w -= step * g);
            self.bias -= step * grad_b;
        }

        tracing::debug!("Logistic regression stopped after {} iterations", self.n_iter);
        Ok(())
    }

    fn decision(&self, row: &SparseVector) -> f64 {
        row.dot(&self.weights) + self.bias
    }
}
