// ============================================================
// Layer 5b — TF-IDF Vectorizer
// ============================================================
// Turns raw review text into L2-normalised sparse rows:
//
//   tokens  = runs of ≥ 2 word characters (letters, digits, '_')
//   tf(t,d) = raw count of t in d
//   idf(t)  = ln((1 + n) / (1 + df(t))) + 1      (smoothed)
//   row     = tf · idf, then scaled to unit L2 norm
//
// Case is kept unless `lowercase` is set, and stop words are
// matched against the token as it appears after that step. The
// vocabulary is the sorted set of non-stop-word tokens seen
// during `fit`; unseen tokens are ignored by `transform`.

use anyhow::{bail, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::baseline::stopwords;
use crate::domain::features::SparseVector;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    lowercase:  bool,
    stop_words: HashSet<&'static str>,
    vocabulary: HashMap<String, usize>,
    idf:        Vec<f64>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TfidfVectorizer {
    /// English stop words removed; `lowercase` decides case folding.
    pub fn new(lowercase: bool) -> Self {
        Self {
            lowercase,
            stop_words: stopwords::english_set(),
            vocabulary: HashMap::new(),
            idf:        Vec::new(),
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_index(&self, token: &str) -> Option<usize> {
        self.vocabulary.get(token).copied()
    }

    #[cfg(test)]
    pub(crate) fn idf(&self, token: &str) -> Option<f64> {
        self.feature_index(token).map(|i| self.idf[i])
    }

    /// Tokens of `text` after case folding and stop-word removal.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let source = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        word_runs(&source)
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// Learn vocabulary and idf from the training documents only.
    pub fn fit<S: AsRef<str>>(&mut self, docs: &[S]) -> Result<()> {
        if docs.is_empty() {
            bail!("cannot fit TF-IDF on zero documents");
        }

        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in docs {
            let unique: BTreeSet<String> = self.analyze(doc.as_ref()).into_iter().collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }
        if doc_freq.is_empty() {
            bail!("TF-IDF vocabulary is empty; every document contained only stop words");
        }

        let n = docs.len() as f64;
        self.vocabulary.clear();
        self.idf = Vec::with_capacity(doc_freq.len());
        for (i, (token, df)) in doc_freq.into_iter().enumerate() {
            self.idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            self.vocabulary.insert(token, i);
        }

        tracing::info!("TF-IDF fitted: {} documents, {} features", docs.len(), self.vocabulary_size());
        Ok(())
    }

    /// One L2-normalised row; tokens outside the vocabulary are dropped.
    pub fn transform_one(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in self.analyze(text) {
            if let Some(i) = self.feature_index(&token) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }
        let mut row = SparseVector::from_pairs(
            counts.into_iter().map(|(i, tf)| (i, tf * self.idf[i])).collect(),
        );
        row.l2_normalize();
        row
    }

    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<Vec<SparseVector>> {
        if self.vocabulary_size() == 0 {
            bail!("TF-IDF vectorizer used before fit");
        }
        Ok(docs.iter().map(|d| self.transform_one(d.as_ref())).collect())
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, docs: &[S]) -> Result<Vec<SparseVector>> {
        self.fit(docs)?;
        self.transform(docs)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Maximal runs of word characters with at least two characters.
fn word_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|run| run.chars().nth(1).is_some())
}
