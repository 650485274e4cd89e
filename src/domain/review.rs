// ============================================================
// Layer 3 — Review Domain Type
// ============================================================
// One row of the corpus: the raw review text and its polarity.
// Created once by the loader and read-only afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary sentiment polarity. The discriminant is the numeric
/// label used by every model (negative = 0, positive = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Negative = 0,
    Positive = 1,
}

impl Sentiment {
    /// Both classes in label order
    pub const ALL: [Sentiment; 2] = [Sentiment::Negative, Sentiment::Positive];

    /// Parse the literal label strings used by the corpus.
    /// Anything other than `positive` / `negative` is rejected.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Numeric class id (0 or 1)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Positive => "positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single labelled review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Raw review text, untouched by any normalisation
    pub text: String,

    /// Ground-truth polarity
    pub sentiment: Sentiment,
}

impl Review {
    pub fn new(text: impl Into<String>, sentiment: Sentiment) -> Self {
        Self { text: text.into(), sentiment }
    }

    /// Numeric label (0 = negative, 1 = positive)
    pub fn label(&self) -> u8 {
        self.sentiment.as_u8()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_strings_map_to_binary_ids() {
        assert_eq!(Sentiment::from_label("positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label("negative"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::Positive.as_u8(), 1);
        assert_eq!(Sentiment::Negative.as_u8(), 0);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert_eq!(Sentiment::from_label("neutral"), None);
        assert_eq!(Sentiment::from_label("Positive"), None);
    }

    #[test]
    fn test_review_label() {
        let r = Review::new("great film", Sentiment::Positive);
        assert_eq!(r.label(), 1);
        assert_eq!(r.label(), Sentiment::Positive.as_u8());
        assert_eq!(Review::new("dull", Sentiment::Negative).label(), 0);
    }
}
