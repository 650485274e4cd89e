// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the two-column review corpus from a headed CSV file:
//
//   review,sentiment
//   "One of the other reviewers has mentioned ...",positive
//   "A wonderful little production. <br /><br />The ...",positive
//
// The sentiment column must hold exactly `positive` or
// `negative`; anything else aborts the load with the offending
// record index so a broken corpus never trains silently.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::review::{Review, Sentiment};
use crate::domain::traits::ReviewSource;

/// Raw CSV row before label mapping
#[derive(Debug, Deserialize)]
struct RawRecord {
    review: String,
    sentiment: String,
}

/// Loads reviews from a CSV file with `review` and `sentiment` headers.
pub struct CsvReviewLoader {
    path: PathBuf,
}

impl CsvReviewLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReviewSource for CsvReviewLoader {
    fn load_all(&self) -> Result<Vec<Review>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;

        let mut reviews = Vec::new();
        for (index, row) in reader.deserialize::<RawRecord>().enumerate() {
            let row = row.with_context(|| {
                format!("Malformed record {} in '{}'", index, self.path.display())
            })?;

            let Some(sentiment) = Sentiment::from_label(&row.sentiment) else {
                bail!(
                    "Record {} in '{}' has label '{}' (expected 'positive' or 'negative')",
                    index,
                    self.path.display(),
                    row.sentiment
                );
            };
            reviews.push(Review::new(row.review, sentiment));
        }

        if reviews.is_empty() {
            bail!("Corpus '{}' contains no reviews", self.path.display());
        }

        let positives = reviews.iter().filter(|r| r.sentiment == Sentiment::Positive).count();
        tracing::info!(
            "Loaded {} reviews from '{}' ({} positive, {} negative)",
            reviews.len(),
            self.path.display(),
            positives,
            reviews.len() - positives,
        );
        Ok(reviews)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_loads_and_maps_labels() {
        let f = write_csv(
            "review,sentiment\n\"Loved it, truly.\",positive\nDull and slow,negative\n",
        );
        let reviews = CsvReviewLoader::new(f.path()).load_all().unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].text, "Loved it, truly.");
        assert_eq!(reviews[0].label(), 1);
        assert_eq!(reviews[1].label(), 0);
    }

    #[test]
    fn test_rejects_unknown_label() {
        let f = write_csv("review,sentiment\nok movie,neutral\n");
        let err = CsvReviewLoader::new(f.path()).load_all().unwrap_err();
        assert!(err.to_string().contains("neutral"));
    }

    #[test]
    fn test_rejects_empty_corpus() {
        let f = write_csv("review,sentiment\n");
        assert!(CsvReviewLoader::new(f.path()).load_all().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = CsvReviewLoader::new("/definitely/not/here.csv");
        assert!(loader.load_all().is_err());
    }
}
