// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Scores a single sentence with a trained classifier. The same
// tokenizer rules, vocabulary and fixed length used in training
// are applied, so predictions are deterministic for a given
// checkpoint.

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::activation::sigmoid};

use crate::data::encoder::SequenceEncoder;
use crate::data::tokenizer::BasicEnglishTokenizer;
use crate::data::vocab::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::context::ExecutionContext;
use crate::ml::model::CnnClassifier;

pub struct Predictor<B: Backend> {
    model:     CnnClassifier<B>,
    vocab:     Vocabulary,
    tokenizer: BasicEnglishTokenizer,
    encoder:   SequenceEncoder,
    device:    B::Device,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: CnnClassifier<B>, vocab: Vocabulary, max_len: usize, device: B::Device) -> Self {
        Self {
            model,
            vocab,
            tokenizer: BasicEnglishTokenizer::new(max_len),
            encoder:   SequenceEncoder::new(max_len),
            device,
        }
    }

    /// Load the run named `run_id`, or the recorded best run when `None`.
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        run_id: Option<&str>,
        ctx:    &ExecutionContext<B>,
    ) -> Result<Self> {
        let config_id = match run_id {
            Some(id) => id.to_string(),
            None => ckpt.load_best()?.config_id,
        };

        let cfg   = ckpt.load_model_config(&config_id)?;
        let vocab = ckpt.load_vocab()?;
        if vocab.len() != cfg.vocab_size {
            bail!(
                "vocabulary has {} entries but run '{}' was trained with {}",
                vocab.len(),
                config_id,
                cfg.vocab_size
            );
        }

        let model = ckpt.load_model::<B>(&config_id, &cfg, ctx.device())?;
        tracing::info!("Loaded run '{}' (max_len={})", config_id, cfg.max_len);
        Ok(Self::new(model, vocab, cfg.max_len, ctx.device().clone()))
    }

    /// Fixed-length ids the model sees for `sentence`.
    pub fn encode(&self, sentence: &str) -> Vec<u32> {
        self.encoder.encode_text(&self.tokenizer, &self.vocab, sentence)
    }

    /// P(positive) in [0, 1].
    pub fn predict(&self, sentence: &str) -> Result<f32> {
        let ids: Vec<i64> = self.encode(sentence).into_iter().map(i64::from).collect();
        let len = ids.len();
        let input = Tensor::<B, 2, Int>::from_data(TensorData::new(ids, [1, len]), &self.device);

        let prob = sigmoid(self.model.forward(input))
            .reshape([1])
            .into_scalar()
            .elem::<f32>();
        if !prob.is_finite() {
            bail!("model produced a non-finite probability for the input");
        }
        Ok(prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::{VocabularyBuilder, PAD_ID};
    use crate::ml::model::{CnnConfig, HyperParams};
    use burn::backend::NdArray;

    fn predictor() -> Predictor<NdArray> {
        let ctx = ExecutionContext::<NdArray>::new(Default::default(), 9);
        let mut b = VocabularyBuilder::new(1).unwrap();
        b.add_tokens(["good", "bad", "film"]);
        let vocab = b.build();

        let hyper = HyperParams::new()
            .with_embedding_dim(6)
            .with_filter_count(2)
            .with_filter_widths(vec![2])
            .with_dropout(0.0);
        let model = CnnConfig::from_hyper(vocab.len(), 5, PAD_ID as usize, &hyper).init(ctx.device());
        Predictor::new(model, vocab, 5, ctx.device().clone())
    }

    #[test]
    fn test_prediction_is_deterministic_probability() {
        let p = predictor();
        let a = p.predict("A good film!").unwrap();
        let b = p.predict("A good film!").unwrap();
        assert!((0.0..=1.0).contains(&a));
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_unknown_and_empty_sentences_still_score() {
        let p = predictor();
        assert_eq!(p.encode(""), vec![PAD_ID; 5]);
        assert!(p.predict("").is_ok());
        assert!(p.predict("zzz qqq www").is_ok());
    }
}
