// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so the
// concrete loader or classifier can be swapped freely.

use anyhow::Result;

use crate::domain::features::SparseVector;
use crate::domain::review::Review;

// ─── ReviewSource ─────────────────────────────────────────────────────────────
/// Anything that can produce the labelled corpus.
///
/// Implementations:
///   - CsvReviewLoader → two-column CSV file
pub trait ReviewSource {
    /// Load every review from this source.
    fn load_all(&self) -> Result<Vec<Review>>;
}

// ─── BinaryClassifier ─────────────────────────────────────────────────────────
/// A statistical classifier over sparse lexical features.
///
/// `decision` returns a real-valued score where larger means "more
/// positive" and `> 0` is the positive prediction. ROC curves are
/// computed from this score, so any monotonic transform of a
/// probability is acceptable.
pub trait BinaryClassifier {
    /// Short human-readable name used in reports and file names
    fn name(&self) -> &str;

    /// Fit on the full training matrix. `labels[i]` is 0 or 1.
    fn fit(&mut self, rows: &[SparseVector], labels: &[u8]) -> Result<()>;

    /// Signed decision score for one row
    fn decision(&self, row: &SparseVector) -> f64;

    /// Hard prediction derived from the decision score
    fn predict(&self, row: &SparseVector) -> u8 {
        u8::from(self.decision(row) > 0.0)
    }
}
