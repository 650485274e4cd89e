// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Maps tokens to integer ids for the embedding layer.
//
// Reserved ids (fixed, shared by encoder and model):
//   0  <unk>  returned for every lookup miss
//   1  <pad>  fills sequences up to max_len
//
// Regular tokens get ids 2.. in the order they first reach
// `min_freq` while the training split is scanned front to back.
// Appending more training reviews can therefore only add new
// ids at the end; it never removes or renumbers existing ones.
//
// The vocabulary is built from the training split ONLY and is
// immutable afterwards.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, path::Path};

pub const UNK_TOKEN: &str = "<unk>";
pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_ID: u32 = 0;
pub const PAD_ID: u32 = 1;

/// Immutable token ↔ id mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabFile", into = "VocabFile")]
pub struct Vocabulary {
    itos: Vec<String>,
    stoi: HashMap<String, u32>,
    min_freq: usize,
}

/// On-disk form: just the ordered token list
#[derive(Serialize, Deserialize)]
struct VocabFile {
    min_freq: usize,
    tokens: Vec<String>,
}

impl TryFrom<VocabFile> for Vocabulary {
    type Error = String;

    fn try_from(file: VocabFile) -> std::result::Result<Self, Self::Error> {
        if file.tokens.get(UNK_ID as usize).map(String::as_str) != Some(UNK_TOKEN)
            || file.tokens.get(PAD_ID as usize).map(String::as_str) != Some(PAD_TOKEN)
        {
            return Err("vocabulary file does not start with <unk>, <pad>".into());
        }
        let stoi = index_tokens(&file.tokens);
        if stoi.len() != file.tokens.len() {
            return Err("vocabulary file contains duplicate tokens".into());
        }
        Ok(Self { itos: file.tokens, stoi, min_freq: file.min_freq })
    }
}

impl From<Vocabulary> for VocabFile {
    fn from(v: Vocabulary) -> Self {
        VocabFile { min_freq: v.min_freq, tokens: v.itos }
    }
}

fn index_tokens(tokens: &[String]) -> HashMap<String, u32> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i as u32))
        .collect()
}

impl Vocabulary {
    /// Id for `token`, or `UNK_ID` when absent. Never fails.
    pub fn id(&self, token: &str) -> u32 {
        self.stoi.get(token).copied().unwrap_or(UNK_ID)
    }

    /// Token for `id`, if the id is in range
    #[cfg(test)]
    pub(crate) fn token(&self, id: u32) -> Option<&str> {
        self.itos.get(id as usize).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, token: &str) -> bool {
        self.stoi.contains_key(token)
    }

    /// Total size including the two reserved entries
    pub fn len(&self) -> usize {
        self.itos.len()
    }

    pub fn pad_id(&self) -> u32 {
        PAD_ID
    }

    pub fn min_freq(&self) -> usize {
        self.min_freq
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        tracing::debug!("Saved vocabulary ({} entries) to '{}'", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid vocabulary file '{}'", path.display()))
    }
}

// ─── VocabularyBuilder ────────────────────────────────────────────────────────
/// Streams training tokens and assigns ids as they cross `min_freq`.
#[derive(Debug, Clone)]
pub struct VocabularyBuilder {
    min_freq: usize,
    counts: HashMap<String, usize>,
    itos: Vec<String>,
}

impl VocabularyBuilder {
    pub fn new(min_freq: usize) -> Result<Self> {
        if min_freq == 0 {
            bail!("min_freq must be at least 1");
        }
        Ok(Self {
            min_freq,
            counts: HashMap::new(),
            itos: vec![UNK_TOKEN.to_string(), PAD_TOKEN.to_string()],
        })
    }

    /// Count the tokens of one training review.
    pub fn add_tokens<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref();
            if token == UNK_TOKEN || token == PAD_TOKEN {
                continue;
            }
            let count = self.counts.entry(token.to_string()).or_insert(0);
            *count += 1;
            if *count == self.min_freq {
                self.itos.push(token.to_string());
            }
        }
    }

    pub fn build(self) -> Vocabulary {
        let stoi = index_tokens(&self.itos);
        tracing::info!(
            "Vocabulary built: {} entries ({} distinct tokens seen, min_freq={})",
            self.itos.len(),
            self.counts.len(),
            self.min_freq
        );
        Vocabulary { itos: self.itos, stoi, min_freq: self.min_freq }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn build(min_freq: usize, docs: &[&[&str]]) -> Vocabulary {
        let mut b = VocabularyBuilder::new(min_freq).unwrap();
        for doc in docs {
            b.add_tokens(doc.iter());
        }
        b.build()
    }

    #[test]
    fn test_reserved_ids_are_fixed() {
        let v = build(1, &[&["good"]]);
        assert_eq!(v.id(UNK_TOKEN), UNK_ID);
        assert_eq!(v.id(PAD_TOKEN), PAD_ID);
        assert_eq!(v.token(0), Some("<unk>"));
        assert_eq!(v.token(1), Some("<pad>"));
        assert_eq!(v.id("good"), 2);
    }

    #[test]
    fn test_min_freq_threshold() {
        let v = build(2, &[&["a", "b", "a"], &["c", "b"]]);
        assert!(v.contains("a"));
        assert!(v.contains("b"));
        assert!(!v.contains("c"));
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_unknown_lookup_falls_back() {
        let v = build(1, &[&["seen"]]);
        assert_eq!(v.id("never-seen"), UNK_ID);
        assert!((v.id("never-seen") as usize) < v.len());
    }

    #[test]
    fn test_ids_follow_threshold_crossing_order() {
        // "b" reaches 2 before "a" does
        let v = build(2, &[&["a", "b", "b", "a"]]);
        assert_eq!(v.id("b"), 2);
        assert_eq!(v.id("a"), 3);
    }

    #[test]
    fn test_expanding_training_split_keeps_ids() {
        let base: &[&[&str]] = &[&["the", "plot", "was", "thin"], &["the", "acting", "was", "fine"]];
        let small = build(2, base);

        let mut extended = base.to_vec();
        extended.push(&["plot", "twist", "acting", "the", "twist"]);
        let large = build(2, &extended);

        for id in 0..small.len() as u32 {
            let token = small.token(id).unwrap();
            assert_eq!(large.id(token), id, "token {token} was renumbered");
        }
        assert!(large.len() > small.len());
    }

    #[test]
    fn test_building_is_deterministic() {
        let docs: &[&[&str]] = &[&["x", "y", "z", "y"], &["z", "x"]];
        assert_eq!(build(1, docs), build(1, docs));
    }

    #[test]
    fn test_zero_min_freq_rejected() {
        assert!(VocabularyBuilder::new(0).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        let v = build(1, &[&["alpha", "beta"]]);
        v.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(v, loaded);
        assert_eq!(loaded.id("beta"), 3);
    }
}
