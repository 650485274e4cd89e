// ============================================================
// Layer 5b — Bag-of-Words Baselines
// ============================================================
// Classical classifiers over TF-IDF features, used as the
// reference point for the CNN:
//
//   tfidf.rs     — sparse TF-IDF featurizer (English stop words)
//   stopwords.rs — the stop-word list itself
//   logistic.rs  — L2 logistic regression
//   sgd.rs       — hinge-loss SGD with early stopping
//   forest.rs    — shallow random forest
//
// Every model implements `BinaryClassifier`, so the evaluation
// below is shared.

pub mod forest;
pub mod logistic;
pub mod sgd;
pub mod stopwords;
pub mod tfidf;

use anyhow::Result;
use std::path::Path;

use crate::domain::features::SparseVector;
use crate::domain::traits::BinaryClassifier;
use crate::infra::report::{ClassificationReport, RocCurve};

/// Test-set scores of one fitted baseline.
#[derive(Debug, Clone)]
pub struct BaselineOutcome {
    pub name:   String,
    pub report: ClassificationReport,
    pub auc:    f64,
}

/// Fit `model` on the training rows, score the test rows, print the
/// report and confusion matrix, and write `<name>_roc.csv` into
/// `report_dir` when given.
pub fn evaluate_classifier(
    model:        &mut dyn BinaryClassifier,
    train_rows:   &[SparseVector],
    train_labels: &[u8],
    test_rows:    &[SparseVector],
    test_labels:  &[u8],
    report_dir:   Option<&Path>,
) -> Result<BaselineOutcome> {
    let name = model.name().to_string();
    tracing::info!("Fitting {} on {} rows", name, train_rows.len());
    model.fit(train_rows, train_labels)?;

    let scores: Vec<f64> = test_rows.iter().map(|r| model.decision(r)).collect();
    let preds:  Vec<u8>  = scores.iter().map(|&s| u8::from(s > 0.0)).collect();

    let report = ClassificationReport::from_labels(test_labels, &preds)?;
    let roc    = RocCurve::from_scores(test_labels, &scores)?;

    println!("\n## {} ##", name);
    println!("{report}");
    println!("{}", report.confusion);
    println!("ROC AUC: {:.4}", roc.auc);

    if let Some(dir) = report_dir {
        roc.write_csv(&dir.join(format!("{name}_roc.csv")))?;
    }

    Ok(BaselineOutcome { name, report, auc: roc.auc })
}
