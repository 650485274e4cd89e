// ============================================================
// Layer 4 — Sequence Encoder
// ============================================================
// Turns a token stream into a fixed-length id sequence:
//
//   tokens:  ["a", "dull", "film"]           max_len = 6
//   ids:     [ 7,   431,    12,  1, 1, 1 ]   (1 = <pad>)
//
// Every sequence leaving the encoder has exactly `max_len`
// entries, whatever the length of the source text. The same
// encoder and the same vocabulary are used for train,
// validation, test and single-sentence inference.

use crate::data::tokenizer::BasicEnglishTokenizer;
use crate::data::vocab::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceEncoder {
    max_len: usize,
}

impl SequenceEncoder {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Map tokens through `vocab` (unknown → `<unk>`) and right-pad
    /// with `<pad>` up to `max_len`. Tokens arrive already capped by the
    /// tokenizer; any excess from other callers is ignored.
    pub fn encode<I, S>(&self, vocab: &Vocabulary, tokens: I) -> Vec<u32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<u32> = tokens
            .into_iter()
            .take(self.max_len)
            .map(|t| vocab.id(t.as_ref()))
            .collect();
        ids.resize(self.max_len, vocab.pad_id());
        ids
    }

    /// Tokenize and encode raw text in one step
    pub fn encode_text(&self, tokenizer: &BasicEnglishTokenizer, vocab: &Vocabulary, text: &str) -> Vec<u32> {
        self.encode(vocab, tokenizer.tokenize(text))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::{VocabularyBuilder, PAD_ID, UNK_ID};

    fn vocab() -> Vocabulary {
        let mut b = VocabularyBuilder::new(1).unwrap();
        b.add_tokens(["a", "dull", "film", "."]);
        b.build()
    }

    #[test]
    fn test_pads_to_max_len() {
        let enc = SequenceEncoder::new(6);
        let ids = enc.encode(&vocab(), ["a", "dull", "film"]);
        assert_eq!(ids, vec![2, 3, 4, PAD_ID, PAD_ID, PAD_ID]);
    }

    #[test]
    fn test_unknown_tokens_map_to_unk() {
        let enc = SequenceEncoder::new(3);
        let ids = enc.encode(&vocab(), ["a", "brilliant", "film"]);
        assert_eq!(ids, vec![2, UNK_ID, 4]);
    }

    #[test]
    fn test_empty_text_is_all_padding() {
        let tok = BasicEnglishTokenizer::new(5);
        let enc = SequenceEncoder::new(5);
        assert_eq!(enc.encode_text(&tok, &vocab(), ""), vec![PAD_ID; 5]);
    }

    #[test]
    fn test_length_invariant_for_any_text() {
        let max_len = 8;
        let tok = BasicEnglishTokenizer::new(max_len);
        let enc = SequenceEncoder::new(max_len);
        let v = vocab();
        let long = "word ".repeat(500);
        let texts = [
            "",
            "a",
            "A dull film.",
            "exactly eight tokens are in this sentence here",
            long.as_str(),
            "<br /><br />!!!???",
        ];
        for text in texts {
            assert_eq!(enc.encode_text(&tok, &v, text).len(), max_len, "text: {text:?}");
        }
    }

    #[test]
    fn test_ids_always_in_range() {
        let tok = BasicEnglishTokenizer::new(16);
        let enc = SequenceEncoder::new(16);
        let v = vocab();
        let ids = enc.encode_text(&tok, &v, "Zebras, quantum physics and a DULL film.");
        assert!(ids.iter().all(|&id| (id as usize) < v.len()));
    }
}
