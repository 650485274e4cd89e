// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads a trained run (the recorded best one unless a run id is
// given) and scores single sentences with it.

use anyhow::Result;
use burn::tensor::backend::Backend;
use serde::Serialize;
use std::path::PathBuf;

use crate::domain::review::Sentiment;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{context::ExecutionContext, inferencer::Predictor};

/// Probability of the positive class plus the thresholded label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub probability: f32,
    pub sentiment:   Sentiment,
}

impl Prediction {
    pub fn from_probability(probability: f32) -> Self {
        let sentiment = if probability >= 0.5 { Sentiment::Positive } else { Sentiment::Negative };
        Self { probability, sentiment }
    }
}

pub struct PredictUseCase<B: Backend> {
    predictor: Predictor<B>,
}

impl<B: Backend> PredictUseCase<B> {
    pub fn new(checkpoint_dir: PathBuf, run: Option<String>, device: B::Device) -> Result<Self> {
        let ckpt = CheckpointManager::new(&checkpoint_dir)?;
        // Inference draws no random numbers; the seed is irrelevant
        let ctx = ExecutionContext::<B>::new(device, 0);
        let predictor = Predictor::from_checkpoint(&ckpt, run.as_deref(), &ctx)?;
        Ok(Self { predictor })
    }

    pub fn predict(&self, sentence: &str) -> Result<Prediction> {
        let probability = self.predictor.predict(sentence)?;
        tracing::debug!("P(positive)={:.4} for {:?}", probability, sentence);
        Ok(Prediction::from_probability(probability))
    }
}
