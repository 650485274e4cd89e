// ============================================================
// Layer 6 — Evaluation Reports
// ============================================================
// Binary-classification summaries shared by the baselines and
// the CNN:
//
//   ConfusionMatrix      — 2×2 counts, rows = truth, cols = prediction
//   ClassificationReport — precision / recall / F1 / support per
//                          class, accuracy, macro and weighted averages
//   RocCurve             — (fpr, tpr, threshold) points and AUC
//
// Labels are 0 = negative, 1 = positive. Plots are left to
// whatever reads the CSV files written here.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::{fmt, fs, io::Write, path::Path};

use crate::domain::review::Sentiment;

fn check_lengths(y_true: &[u8], y_pred_len: usize) -> Result<()> {
    if y_true.len() != y_pred_len {
        bail!("{} labels but {} predictions", y_true.len(), y_pred_len);
    }
    if y_true.is_empty() {
        bail!("cannot evaluate an empty prediction set");
    }
    Ok(())
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

// ─── Confusion Matrix ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    /// `counts[truth][predicted]`
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        check_lengths(y_true, y_pred.len())?;
        let mut counts = [[0usize; 2]; 2];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t > 1 || p > 1 {
                bail!("labels must be 0 or 1, got truth={} prediction={}", t, p);
            }
            counts[t as usize][p as usize] += 1;
        }
        Ok(Self { counts })
    }

    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16}{:>12}{:>12}", "", "pred neg", "pred pos")?;
        writeln!(f, "{:>16}{:>12}{:>12}", "true negative", self.true_negatives(), self.false_positives())?;
        writeln!(f, "{:>16}{:>12}{:>12}", "true positive", self.false_negatives(), self.true_positives())?;
        Ok(())
    }
}

// ─── Classification Report ────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Indexed by label (0 = negative, 1 = positive)
    pub classes:      [ClassMetrics; 2],
    pub accuracy:     f64,
    pub macro_avg:    ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion:    ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;

        let per_class = |c: usize| {
            let tp        = cm.counts[c][c];
            let predicted = cm.counts[0][c] + cm.counts[1][c];
            let support   = cm.counts[c][0] + cm.counts[c][1];
            let precision = ratio(tp, predicted);
            let recall    = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics { precision, recall, f1, support }
        };
        let classes = [per_class(0), per_class(1)];

        let total = cm.total();
        let macro_avg = ClassMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall:    classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1:        classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
            support:   total,
        };
        let weight = |c: &ClassMetrics| c.support as f64 / total as f64;
        let weighted_avg = ClassMetrics {
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall:    classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1:        classes.iter().map(|c| c.f1 * weight(c)).sum(),
            support:   total,
        };

        Ok(Self {
            classes,
            accuracy: ratio(cm.true_positives() + cm.true_negatives(), total),
            macro_avg,
            weighted_avg,
            confusion: cm,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14}{:>11}{:>11}{:>11}{:>11}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in Sentiment::ALL {
            let m = &self.classes[class.as_u8() as usize];
            writeln!(
                f,
                "{:>14}{:>11.2}{:>11.2}{:>11.2}{:>11}",
                class.name(), m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        let total = self.macro_avg.support;
        writeln!(f, "{:>14}{:>11}{:>11}{:>11.2}{:>11}", "accuracy", "", "", self.accuracy, total)?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14}{:>11.2}{:>11.2}{:>11.2}{:>11}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

// ─── ROC Curve ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub fpr:       f64,
    pub tpr:       f64,
    /// Scores ≥ threshold are called positive (+inf for the origin)
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc:    f64,
}

impl RocCurve {
    /// Needs both classes present in `y_true`.
    pub fn from_scores(y_true: &[u8], scores: &[f64]) -> Result<Self> {
        check_lengths(y_true, scores.len())?;
        if scores.iter().any(|s| s.is_nan()) {
            bail!("scores contain NaN");
        }
        let positives = y_true.iter().filter(|&&y| y == 1).count();
        let negatives = y_true.len() - positives;
        if positives == 0 || negatives == 0 {
            bail!("ROC needs both classes, got {} positive / {} negative", positives, negatives);
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut points = vec![RocPoint { fpr: 0.0, tpr: 0.0, threshold: f64::INFINITY }];
        let (mut tp, mut fp) = (0usize, 0usize);
        for (k, &i) in order.iter().enumerate() {
            if y_true[i] == 1 { tp += 1 } else { fp += 1 }
            // Emit one point per distinct score
            let last_of_run = order.get(k + 1).map_or(true, |&j| scores[j] != scores[i]);
            if last_of_run {
                points.push(RocPoint {
                    fpr:       ratio(fp, negatives),
                    tpr:       ratio(tp, positives),
                    threshold: scores[i],
                });
            }
        }

        let auc = points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum();

        Ok(Self { points, auc })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut f = fs::File::create(path)
            .with_context(|| format!("Cannot create ROC file '{}'", path.display()))?;
        writeln!(f, "fpr,tpr,threshold")?;
        for p in &self.points {
            writeln!(f, "{:.6},{:.6},{}", p.fpr, p.tpr, p.threshold)?;
        }
        tracing::debug!("Wrote ROC curve ({} points) to '{}'", self.points.len(), path.display());
        Ok(())
    }
}
