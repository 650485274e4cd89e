// ============================================================
// Layer 5b — Random Forest
// ============================================================
// Bagged ensemble of shallow Gini decision trees over sparse
// TF-IDF rows.
//
//   for each tree:
//     draw n rows with replacement (bootstrap weights)
//     grow to `max_depth`; at every node try √F random features
//     leaf value = weighted share of positive rows
//   P(positive) = mean leaf value over trees
//
// Features are non-negative and mostly zero, so candidate
// thresholds come only from the non-zero column entries; every
// row absent from a column sits in the "≤ smallest" bucket.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};

use crate::domain::features::SparseVector;
use crate::domain::traits::BinaryClassifier;

#[derive(Debug, Clone)]
enum Node {
    Leaf { positive_rate: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn probability(&self, row: &SparseVector) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { positive_rate } => return *positive_rate,
                Node::Split { feature, threshold, left, right } => {
                    at = if row.get(*feature) <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Column-major view of the training matrix: `columns[f]` holds
/// `(row, value)` for every non-zero entry of feature `f`.
struct Columns {
    columns: Vec<Vec<(usize, f64)>>,
}

impl Columns {
    fn from_rows(rows: &[SparseVector]) -> Self {
        let n_features = rows.iter().filter_map(|r| r.entries().last().map(|&(i, _)| i + 1)).max().unwrap_or(0);
        let mut columns = vec![Vec::new(); n_features];
        for (r, row) in rows.iter().enumerate() {
            for &(f, v) in row.entries() {
                columns[f].push((r, v));
            }
        }
        Self { columns }
    }

    fn n_features(&self) -> usize {
        self.columns.len()
    }
}

fn gini(pos: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = pos / total;
    2.0 * p * (1.0 - p)
}

struct SplitChoice {
    feature:   usize,
    threshold: f64,
    impurity:  f64,
}

/// Best threshold on one feature for the rows weighted by `weights`.
fn best_threshold(
    column:  &[(usize, f64)],
    weights: &[f64],
    labels:  &[u8],
    total:   f64,
    pos:     f64,
) -> Option<(f64, f64)> {
    let mut present: Vec<(f64, f64, f64)> = column
        .iter()
        .filter(|&&(r, _)| weights[r] > 0.0)
        .map(|&(r, v)| (v, weights[r], if labels[r] == 1 { weights[r] } else { 0.0 }))
        .collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Rows missing from the column are zeros, the smallest value
    let nz_total: f64 = present.iter().map(|p| p.1).sum();
    let nz_pos:   f64 = present.iter().map(|p| p.2).sum();
    let mut left_total = total - nz_total;
    let mut left_pos   = pos - nz_pos;
    let mut prev       = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for &(v, w, p) in &present {
        if v > prev && left_total > 0.0 {
            let right_total = total - left_total;
            let impurity = (left_total * gini(left_pos, left_total)
                + right_total * gini(pos - left_pos, right_total))
                / total;
            let threshold = (prev + v) / 2.0;
            if best.map_or(true, |(_, b)| impurity < b) {
                best = Some((threshold, impurity));
            }
        }
        left_total += w;
        left_pos   += p;
        prev        = v;
    }
    best
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    pub n_trees:   usize,
    pub max_depth: usize,
    seed:          u64,
    trees:         Vec<Tree>,
}

impl RandomForest {
    pub fn new(n_trees: usize, max_depth: usize, seed: u64) -> Self {
        Self { n_trees, max_depth, seed, trees: Vec::new() }
    }

    /// 250 trees of depth 3
    pub fn shallow(seed: u64) -> Self {
        Self::new(250, 3, seed)
    }

    #[cfg(test)]
    pub(crate) fn n_fitted_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn probability(&self, row: &SparseVector) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.probability(row)).sum::<f64>() / self.trees.len() as f64
    }

    fn grow(
        &self,
        cols:    &Columns,
        labels:  &[u8],
        weights: Vec<f64>,
        rng:     &mut StdRng,
    ) -> Tree {
        let mut nodes = Vec::new();
        self.grow_node(cols, labels, weights, 0, rng, &mut nodes);
        Tree { nodes }
    }

    fn grow_node(
        &self,
        cols:    &Columns,
        labels:  &[u8],
        weights: Vec<f64>,
        depth:   usize,
        rng:     &mut StdRng,
        nodes:   &mut Vec<Node>,
    ) -> usize {
        let total: f64 = weights.iter().sum();
        let pos:   f64 = weights.iter().zip(labels).filter(|(_, l)| **l == 1).map(|(w, _)| *w).sum();
        let id = nodes.len();
        let positive_rate = if total > 0.0 { pos / total } else { 0.5 };
        nodes.push(Node::Leaf { positive_rate });

        let pure = pos == 0.0 || pos == total;
        if depth >= self.max_depth || pure || cols.n_features() == 0 {
            return id;
        }

        let n_candidates = ((cols.n_features() as f64).sqrt() as usize).max(1);
        let parent = gini(pos, total);
        let mut best: Option<SplitChoice> = None;
        for f in index::sample(rng, cols.n_features(), n_candidates) {
            if let Some((threshold, impurity)) = best_threshold(&cols.columns[f], &weights, labels, total, pos) {
                if impurity < parent && best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(SplitChoice { feature: f, threshold, impurity });
                }
            }
        }

        let Some(split) = best else {
            return id;
        };

        // Partition weights: rows with value > threshold go right
        let mut right_w = vec![0.0; weights.len()];
        let mut left_w  = weights;
        for &(r, v) in &cols.columns[split.feature] {
            if v > split.threshold && left_w[r] > 0.0 {
                right_w[r] = left_w[r];
                left_w[r]  = 0.0;
            }
        }

        let left  = self.grow_node(cols, labels, left_w, depth + 1, rng, nodes);
        let right = self.grow_node(cols, labels, right_w, depth + 1, rng, nodes);
        nodes[id] = Node::Split { feature: split.feature, threshold: split.threshold, left, right };
        id
    }
}

impl BinaryClassifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&mut self, rows: &[SparseVector], labels: &[u8]) -> Result<()> {
        if rows.len() != labels.len() || rows.is_empty() {
            bail!("need matching non-empty rows and labels ({} vs {})", rows.len(), labels.len());
        }
        if self.n_trees == 0 || self.max_depth == 0 {
            bail!("random forest needs at least one tree of depth ≥ 1");
        }

        let cols = Columns::from_rows(rows);
        let n = rows.len();
        self.trees = Vec::with_capacity(self.n_trees);
        for t in 0..self.n_trees {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
            let mut weights = vec![0.0; n];
            for _ in 0..n {
                weights[rng.gen_range(0..n)] += 1.0;
            }
            let tree = self.grow(&cols, labels, weights, &mut rng);
            self.trees.push(tree);
        }

        tracing::debug!("Random forest fitted: {} trees over {} features", self.trees.len(), cols.n_features());
        Ok(())
    }

    /// Centred so that `> 0` means a majority of positive votes
    fn decision(&self, row: &SparseVector) -> f64 {
        self.probability(row) - 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_feature_data() -> (Vec<SparseVector>, Vec<u8>) {
        // Feature 0 present ⇒ positive; everything else is noise
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let noise = SparseVector::from_pairs(vec![(1 + i % 3, 0.3)]);
            if i % 2 == 0 {
                let mut pairs = noise.entries().to_vec();
                pairs.push((0, 0.8));
                rows.push(SparseVector::from_pairs(pairs));
                labels.push(1);
            } else {
                rows.push(noise);
                labels.push(0);
            }
        }
        (rows, labels)
    }

    #[test]
    fn test_best_threshold_separates_zero_from_nonzero() {
        let column  = vec![(0, 0.8), (2, 0.6)];
        let weights = vec![1.0, 1.0, 1.0, 1.0];
        let labels  = vec![1, 0, 1, 0];
        let (threshold, impurity) = best_threshold(&column, &weights, &labels, 4.0, 2.0).unwrap();
        assert!(threshold > 0.0 && threshold < 0.6);
        assert_eq!(impurity, 0.0);
    }

    #[test]
    fn test_forest_learns_single_feature() {
        let (rows, labels) = one_feature_data();
        let mut rf = RandomForest::new(25, 3, 11);
        rf.fit(&rows, &labels).unwrap();
        assert_eq!(rf.n_fitted_trees(), 25);
        let correct = rows.iter().zip(&labels).filter(|(r, l)| rf.predict(r) == **l).count();
        assert!(correct >= 36, "only {correct}/40 correct");
        assert!((0.0..=1.0).contains(&rf.probability(&rows[0])));
    }

    #[test]
    fn test_seeded_forest_is_reproducible() {
        let (rows, labels) = one_feature_data();
        let mut a = RandomForest::new(5, 2, 4);
        let mut b = RandomForest::new(5, 2, 4);
        a.fit(&rows, &labels).unwrap();
        b.fit(&rows, &labels).unwrap();
        for r in &rows {
            assert_eq!(a.probability(r).to_bits(), b.probability(r).to_bits());
        }
    }

    #[test]
    fn test_rejects_empty_forest() {
        let (rows, labels) = one_feature_data();
        assert!(RandomForest::new(0, 3, 1).fit(&rows, &labels).is_err());
    }
}
