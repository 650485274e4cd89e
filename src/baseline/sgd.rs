// ============================================================
// Layer 5b — SGD Linear Classifier
// ============================================================
// Linear SVM (hinge loss, L2 penalty) trained by plain SGD with
// the "optimal" learning-rate schedule
//
//   eta_t = 1 / (alpha · (t0 + t))
//
// where t0 comes from the usual typical-weight heuristic. Each
// epoch visits the training rows in a fresh random order.
//
// Early stopping: a stratified `validation_fraction` of the rows
// is held out; after every epoch the held-out accuracy is
// scored, and training stops once `n_iter_no_change` epochs in a
// row fail to beat the best score by more than `tol`.
//
// Weights are stored as `scale · w` so the L2 shrink per step is
// O(1) instead of O(features).

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::splitter::stratified_split;
use crate::domain::features::SparseVector;
use crate::domain::traits::BinaryClassifier;

const INTERCEPT_DECAY: f64 = 0.01;
const MIN_SCALE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SgdClassifier {
    pub alpha:               f64,
    pub max_iter:            usize,
    pub tol:                 f64,
    pub validation_fraction: f64,
    pub n_iter_no_change:    usize,
    seed:                    u64,
    weights:                 Vec<f64>,
    scale:                   f64,
    bias:                    f64,
    n_iter:                  usize,
}

impl SgdClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            alpha:               1e-4,
            max_iter:            1000,
            tol:                 1e-3,
            validation_fraction: 0.1,
            n_iter_no_change:    5,
            seed,
            weights:             Vec::new(),
            scale:               1.0,
            bias:                0.0,
            n_iter:              0,
        }
    }

    /// Epochs run by the last `fit`
    #[cfg(test)]
    pub(crate) fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn optimal_t0(&self) -> f64 {
        // Hinge dloss at the typical weight is -1, so eta0 = typw
        let typw = (1.0 / self.alpha.sqrt()).sqrt();
        1.0 / (typw * self.alpha)
    }

    fn rescale(&mut self) {
        let s = self.scale;
        self.weights.iter_mut().for_each(|w| *w *= s);
        self.scale = 1.0;
    }

    fn accuracy(&self, rows: &[SparseVector], labels: &[u8], idx: &[usize]) -> f64 {
        let correct = idx.iter().filter(|&&i| self.predict(&rows[i]) == labels[i]).count();
        correct as f64 / idx.len() as f64
    }
}

impl BinaryClassifier for SgdClassifier {
    fn name(&self) -> &str {
        "sgd_classifier"
    }

    fn fit(&mut self, rows: &[SparseVector], labels: &[u8]) -> Result<()> {
        if rows.len() != labels.len() || rows.is_empty() {
            bail!("need matching non-empty rows and labels ({} vs {})", rows.len(), labels.len());
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            bail!("alpha must be positive, got {}", self.alpha);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let indices: Vec<usize> = (0..rows.len()).collect();
        let (mut train_idx, valid_idx) =
            stratified_split(indices, |&i| labels[i], self.validation_fraction, &mut rng)?;

        let n_features = rows.iter().filter_map(|r| r.entries().last().map(|&(i, _)| i + 1)).max().unwrap_or(0);
        self.weights = vec![0.0; n_features];
        self.scale   = 1.0;
        self.bias    = 0.0;
        self.n_iter  = 0;

        let t0 = self.optimal_t0();
        let mut t = 1.0;
        let mut best_score = f64::NEG_INFINITY;
        let mut no_improvement = 0;

        for epoch in 1..=self.max_iter {
            train_idx.shuffle(&mut rng);
            for &i in &train_idx {
                let y   = if labels[i] == 1 { 1.0 } else { -1.0 };
                let eta = 1.0 / (self.alpha * (t0 + t));
                let margin = y * self.decision(&rows[i]);

                self.scale *= 1.0 - eta * self.alpha;
                if margin < 1.0 {
                    let step = eta * y / self.scale;
                    for &(j, v) in rows[i].entries() {
                        self.weights[j] += step * v;
                    }
                    self.bias += eta * y * INTERCEPT_DECAY;
                }
                if self.scale < MIN_SCALE {
                    self.rescale();
                }
                t += 1.0;
            }
            self.n_iter = epoch;

            let score = self.accuracy(rows, labels, &valid_idx);
            if score < best_score + self.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if score > best_score {
                best_score = score;
            }
            if no_improvement >= self.n_iter_no_change {
                tracing::debug!("SGD early stop at epoch {} (validation accuracy {:.4})", epoch, best_score);
                break;
            }
        }

        self.rescale();
        Ok(())
    }

    fn decision(&self, row: &SparseVector) -> f64 {
        self.scale * row.dot(&self.weights) + self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(n: usize) -> (Vec<SparseVector>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let noise = (i % 7) as f64 * 0.05;
            if i % 2 == 0 {
                rows.push(SparseVector::from_pairs(vec![(0, 1.0), (2, noise)]));
                labels.push(1);
            } else {
                rows.push(SparseVector::from_pairs(vec![(1, 1.0), (2, noise)]));
                labels.push(0);
            }
        }
        (rows, labels)
    }

    #[test]
    fn test_learns_and_stops_early() {
        let (rows, labels) = blobs(60);
        let mut sgd = SgdClassifier::new(7);
        sgd.fit(&rows, &labels).unwrap();
        let correct = rows.iter().zip(&labels).filter(|(r, l)| sgd.predict(r) == **l).count();
        assert_eq!(correct, rows.len());
        assert!(sgd.n_iter() < sgd.max_iter);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (rows, labels) = blobs(40);
        let mut a = SgdClassifier::new(3);
        let mut b = SgdClassifier::new(3);
        a.fit(&rows, &labels).unwrap();
        b.fit(&rows, &labels).unwrap();
        assert_eq!(a.decision(&rows[0]).to_bits(), b.decision(&rows[0]).to_bits());
    }

    #[test]
    fn test_too_few_rows_for_validation_split() {
        let rows = vec![SparseVector::from_pairs(vec![(0, 1.0)]); 2];
        assert!(SgdClassifier::new(1).fit(&rows, &[1, 0]).is_err());
    }
}
