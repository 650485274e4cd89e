// ============================================================
// Layer 2 — BaselineUseCase
// ============================================================
//   Step 1: Load the CSV corpus            (Layer 4 - data)
//   Step 2: Stratified train/test split    (Layer 4 - data)
//   Step 3: Fit TF-IDF on the train split  (Layer 5b - baseline)
//   Step 4: Fit + evaluate each classifier (Layer 5b / Layer 6)

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::resolve_seed;
use crate::baseline::{
    evaluate_classifier,
    forest::RandomForest,
    logistic::LogisticRegression,
    sgd::SgdClassifier,
    tfidf::TfidfVectorizer,
    BaselineOutcome,
};
use crate::data::{loader::CsvReviewLoader, splitter::stratified_split};
use crate::domain::traits::{BinaryClassifier, ReviewSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub data_path:     PathBuf,
    /// Where ROC CSVs go; nothing is written when `None`
    pub report_dir:    Option<PathBuf>,
    pub seed:          Option<u64>,
    pub test_fraction: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            data_path:     PathBuf::from("data/reviews.csv"),
            report_dir:    None,
            seed:          None,
            test_fraction: 0.2,
        }
    }
}

pub struct BaselineUseCase {
    config: BaselineConfig,
}

impl BaselineUseCase {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<BaselineOutcome>> {
        let cfg  = &self.config;
        let seed = resolve_seed(cfg.seed);

        // ── Step 1: Load ──────────────────────────────────────────────────────
        let reviews = CsvReviewLoader::new(&cfg.data_path).load_all()?;

        // ── Step 2: Split ─────────────────────────────────────────────────────
        let mut rng = StdRng::seed_from_u64(seed);
        let (train, test) = stratified_split(reviews, |r| r.label(), cfg.test_fraction, &mut rng)?;
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 3: Features ──────────────────────────────────────────────────
        let train_text: Vec<&str> = train.iter().map(|r| r.text.as_str()).collect();
        let test_text:  Vec<&str> = test.iter().map(|r| r.text.as_str()).collect();
        let train_labels: Vec<u8> = train.iter().map(|r| r.label()).collect();
        let test_labels:  Vec<u8> = test.iter().map(|r| r.label()).collect();

        let mut tfidf  = TfidfVectorizer::default();
        let train_rows = tfidf.fit_transform(&train_text)?;
        let test_rows  = tfidf.transform(&test_text)?;

        if let Some(dir) = &cfg.report_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create report directory '{}'", dir.display()))?;
        }

        // ── Step 4: Classifiers ───────────────────────────────────────────────
        let mut models: Vec<Box<dyn BinaryClassifier>> = vec![
            Box::new(LogisticRegression::default()),
            Box::new(SgdClassifier::new(seed)),
            Box::new(RandomForest::shallow(seed)),
        ];

        let mut outcomes = Vec::with_capacity(models.len());
        for model in models.iter_mut() {
            let outcome = evaluate_classifier(
                model.as_mut(),
                &train_rows,
                &train_labels,
                &test_rows,
                &test_labels,
                cfg.report_dir.as_deref(),
            )?;
            tracing::info!(
                "{}: accuracy={:.4}, AUC={:.4}",
                outcome.name,
                outcome.report.accuracy,
                outcome.auc
            );
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(path: &std::path::Path, per_class: usize) {
        let positive = ["a wonderful film", "great acting and story", "loved it, brilliant", "superb and moving cast", "great fun throughout"];
        let negative = ["a boring film", "awful acting and plot", "hated it, dreadful", "terrible and dull cast", "awful waste throughout"];
        let mut f = fs::File::create(path).unwrap();
        writeln!(f, "review,sentiment").unwrap();
        for i in 0..per_class {
            writeln!(f, "\"{} {}\",positive", positive[i % positive.len()], i).unwrap();
            writeln!(f, "\"{} {}\",negative", negative[i % negative.len()], i).unwrap();
        }
    }

    #[test]
    fn test_runs_all_three_baselines() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("reviews.csv");
        write_corpus(&data, 25);

        let cfg = BaselineConfig {
            data_path:     data,
            report_dir:    Some(dir.path().join("reports")),
            seed:          Some(5),
            test_fraction: 0.2,
        };
        let outcomes = BaselineUseCase::new(cfg).execute().unwrap();

        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["logistic_regression", "sgd_classifier", "random_forest"]);
        for o in &outcomes {
            assert_eq!(o.report.macro_avg.support, 10);
            assert!(dir.path().join("reports").join(format!("{}_roc.csv", o.name)).exists());
        }
        assert!(outcomes[0].report.accuracy > 0.9);
    }
}
