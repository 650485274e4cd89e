// ============================================================
// Layer 4 — Review Dataset
// ============================================================
// Encoded reviews wrapped in Burn's Dataset trait so the
// DataLoader can index into them.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::encoder::SequenceEncoder;
use crate::data::tokenizer::BasicEnglishTokenizer;
use crate::data::vocab::Vocabulary;
use crate::domain::review::Review;

/// One encoded review: fixed-length ids plus its 0/1 label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub ids:   Vec<u32>,
    pub label: u8,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewDataset {
    items: Vec<ReviewItem>,
}

impl ReviewDataset {
    #[cfg(test)]
    pub(crate) fn new(items: Vec<ReviewItem>) -> Self {
        Self { items }
    }

    /// Tokenize and encode `reviews` with a shared vocabulary.
    pub fn encode(
        reviews:   &[Review],
        tokenizer: &BasicEnglishTokenizer,
        encoder:   &SequenceEncoder,
        vocab:     &Vocabulary,
    ) -> Self {
        let items = reviews
            .iter()
            .map(|r| ReviewItem {
                ids:   encoder.encode_text(tokenizer, vocab, &r.text),
                label: r.label(),
            })
            .collect();
        Self { items }
    }

    #[cfg(test)]
    pub(crate) fn items(&self) -> &[ReviewItem] {
        &self.items
    }

    pub fn labels(&self) -> Vec<u8> {
        self.items.iter().map(|i| i.label).collect()
    }
}

impl Dataset<ReviewItem> for ReviewDataset {
    fn get(&self, index: usize) -> Option<ReviewItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::VocabularyBuilder;
    use crate::domain::review::Sentiment;

    #[test]
    fn test_encode_keeps_labels_and_length() {
        let reviews = vec![
            Review::new("Great fun", Sentiment::Positive),
            Review::new("Awful", Sentiment::Negative),
        ];
        let tok = BasicEnglishTokenizer::new(4);
        let mut b = VocabularyBuilder::new(1).unwrap();
        for r in &reviews {
            b.add_tokens(tok.tokenize(&r.text));
        }
        let vocab = b.build();
        let ds = ReviewDataset::encode(&reviews, &tok, &SequenceEncoder::new(4), &vocab);

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labels(), vec![1, 0]);
        assert!(ds.items().iter().all(|i| i.ids.len() == 4));
        assert_eq!(ds.get(1).unwrap().ids[0], vocab.id("awful"));
        assert!(ds.get(2).is_none());
    }
}
