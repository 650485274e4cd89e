// ============================================================
// Layer 5 — Convolutional Sentiment Classifier
// ============================================================
// Word-embedding CNN over fixed-length id sequences:
//
//   ids [B, L]
//     → embedding            [B, L, E]   (<pad> rows masked to 0)
//     → dropout
//     → swap to channels     [B, E, L]
//     → per filter width k:
//         conv1d(E → F, k)   [B, F, L-k+1]
//         relu
//         global max pool    [B, F]
//     → concat               [B, F * n_widths]
//     → dropout
//     → linear               [B, 1]      (logit)
//
// Max pooling over the sequence axis makes the score independent
// of where a telling phrase appears in the review.
//
// The padding row of the embedding table starts at zero and is
// multiplied by a 0 mask in the forward pass, so it never
// contributes to the output and never receives a gradient.

use anyhow::{bail, Result};
use burn::{
    module::Param,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        loss::BinaryCrossEntropyLossConfig,
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

// ─── Hyperparameters ──────────────────────────────────────────────────────────
/// One point of the hyperparameter sweep. Defaults are the baseline
/// configuration (300-d embeddings, 100 filters of widths 3/5/7).
#[derive(Config, Debug, PartialEq)]
pub struct HyperParams {
    #[config(default = 300)]
    pub embedding_dim: usize,

    #[config(default = "vec![3, 5, 7]")]
    pub filter_widths: Vec<usize>,

    /// Filters per width
    #[config(default = 100)]
    pub filter_count: usize,

    #[config(default = 0.25)]
    pub dropout: f64,

    #[config(default = 1024)]
    pub batch_size: usize,
}

impl HyperParams {
    /// The three configurations compared by the sweep: baseline,
    /// more filters, wider embeddings.
    pub fn presets() -> Vec<HyperParams> {
        vec![
            HyperParams::new(),
            HyperParams::new().with_filter_count(200),
            HyperParams::new().with_embedding_dim(1000),
        ]
    }

    /// Check ranges against the sequence length the model will see.
    pub fn validate(&self, max_len: usize) -> Result<()> {
        if !(1..=4096).contains(&self.embedding_dim) {
            bail!("embedding_dim must be in 1..=4096, got {}", self.embedding_dim);
        }
        if !(1..=4096).contains(&self.filter_count) {
            bail!("filter_count must be in 1..=4096, got {}", self.filter_count);
        }
        if self.filter_widths.is_empty() {
            bail!("at least one filter width is required");
        }
        for (i, &w) in self.filter_widths.iter().enumerate() {
            if w == 0 || w > max_len {
                bail!("filter width {} must be in 1..={} (max_len)", w, max_len);
            }
            if self.filter_widths[..i].contains(&w) {
                bail!("filter width {} listed twice", w);
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        Ok(())
    }

    /// Stable, filesystem-safe identity used to key checkpoints,
    /// e.g. `emb300-nf100-fw3_5_7-do0p25-bs1024`. Two configurations
    /// that differ in any field get different ids.
    pub fn config_id(&self) -> String {
        let widths: Vec<String> = self.filter_widths.iter().map(usize::to_string).collect();
        format!(
            "emb{}-nf{}-fw{}-do{}-bs{}",
            self.embedding_dim,
            self.filter_count,
            widths.join("_"),
            self.dropout.to_string().replace('.', "p"),
            self.batch_size,
        )
    }
}

// ─── Model Config ─────────────────────────────────────────────────────────────
/// Everything needed to rebuild the architecture, persisted next to
/// each checkpoint.
#[derive(Config, Debug)]
pub struct CnnConfig {
    pub vocab_size:    usize,
    pub max_len:       usize,
    pub pad_id:        usize,
    pub embedding_dim: usize,
    pub filter_widths: Vec<usize>,
    pub filter_count:  usize,
    pub dropout:       f64,
}

impl CnnConfig {
    pub fn from_hyper(vocab_size: usize, max_len: usize, pad_id: usize, hyper: &HyperParams) -> Self {
        CnnConfig::new(
            vocab_size,
            max_len,
            pad_id,
            hyper.embedding_dim,
            hyper.filter_widths.clone(),
            hyper.filter_count,
            hyper.dropout,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> CnnClassifier<B> {
        let mut embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device);
        let pad = self.pad_id;
        let zero_row = Tensor::<B, 2>::zeros([1, self.embedding_dim], device);
        let weight = embedding
            .weight
            .val()
            .slice_assign([pad..pad + 1, 0..self.embedding_dim], zero_row);
        embedding.weight = Param::from_tensor(weight.detach());

        let convs = self
            .filter_widths
            .iter()
            .map(|&width| Conv1dConfig::new(self.embedding_dim, self.filter_count, width).init(device))
            .collect();

        let output = LinearConfig::new(self.filter_count * self.filter_widths.len(), 1).init(device);

        CnnClassifier {
            embedding,
            convs,
            output,
            dropout: DropoutConfig::new(self.dropout).init(),
            pad_id: self.pad_id,
        }
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CnnClassifier<B: Backend> {
    embedding: Embedding<B>,
    convs:     Vec<Conv1d<B>>,
    output:    Linear<B>,
    dropout:   Dropout,
    pad_id:    usize,
}

impl<B: Backend> CnnClassifier<B> {
    /// ids: [batch, max_len] → logits: [batch, 1]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let keep = ids
            .clone()
            .not_equal_elem(self.pad_id as i64)
            .float()
            .unsqueeze_dim::<3>(2);

        let embedded = self.embedding.forward(ids);
        let embedded = embedded.clone() * keep.expand(embedded.dims());
        let x = self.dropout.forward(embedded).swap_dims(1, 2);

        let pooled: Vec<Tensor<B, 2>> = self
            .convs
            .iter()
            .map(|conv| {
                let maps = relu(conv.forward(x.clone()));
                let [batch, filters, _] = maps.dims();
                maps.max_dim(2).reshape([batch, filters])
            })
            .collect();

        let features = self.dropout.forward(Tensor::cat(pooled, 1));
        self.output.forward(features)
    }

    #[cfg(test)]
    pub(crate) fn embedding_row(&self, id: usize) -> Vec<f32> {
        let [_, dim] = self.embedding.weight.val().dims();
        self.embedding
            .weight
            .val()
            .slice([id..id + 1, 0..dim])
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap()
    }

    /// Mean binary cross-entropy computed from logits, plus the logits.
    /// labels: [batch, 1] with values 0/1.
    pub fn forward_loss(
        &self,
        ids:    Tensor<B, 2, Int>,
        labels: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(ids);
        let loss = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};
    use burn::tensor::TensorData;

    type B = NdArray;

    fn small_config() -> CnnConfig {
        let hyper = HyperParams::new()
            .with_embedding_dim(6)
            .with_filter_count(4)
            .with_filter_widths(vec![2, 3])
            .with_dropout(0.0);
        CnnConfig::from_hyper(12, 8, 1, &hyper)
    }

    fn ids<BK: Backend>(rows: &[[i64; 8]]) -> Tensor<BK, 2, Int> {
        let flat: Vec<i64> = rows.iter().flatten().copied().collect();
        Tensor::from_data(TensorData::new(flat, [rows.len(), 8]), &Default::default())
    }

    #[test]
    fn test_forward_shape() {
        let model = small_config().init::<B>(&Default::default());
        let logits = model.forward(ids(&[[2, 3, 4, 5, 1, 1, 1, 1], [6, 1, 1, 1, 1, 1, 1, 1]]));
        assert_eq!(logits.dims(), [2, 1]);
    }

    #[test]
    fn test_padding_row_is_zero() {
        let model = small_config().init::<B>(&Default::default());
        assert_eq!(model.embedding_row(1), vec![0.0; 6]);
        assert!(model.embedding_row(2).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_padding_row_stays_zero_under_adam() {
        type AB = Autodiff<NdArray>;
        let device    = Default::default();
        let mut model = small_config().init::<AB>(&device);
        let mut optim = AdamConfig::new().init::<AB, CnnClassifier<AB>>();
        let before    = model.embedding_row(2);

        for _ in 0..3 {
            let labels = Tensor::<AB, 2, Int>::from_data(TensorData::new(vec![1i64, 0], [2, 1]), &device);
            let (loss, _) = model.forward_loss(ids(&[[2, 3, 4, 5, 1, 1, 1, 1], [7, 8, 1, 1, 1, 1, 1, 1]]), labels);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(1e-2, model, grads);
        }

        assert_eq!(model.embedding_row(1), vec![0.0; 6]);
        assert_ne!(model.embedding_row(2), before);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let model = small_config().init::<B>(&Default::default());
        let labels = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![1i64, 0], [2, 1]), &Default::default());
        let (loss, _) = model.forward_loss(ids(&[[2, 3, 4, 5, 1, 1, 1, 1], [7, 8, 1, 1, 1, 1, 1, 1]]), labels);
        let value = loss.into_scalar().elem::<f64>();
        assert!(value.is_finite() && value > 0.0);
    }

    #[test]
    fn test_presets_are_valid_and_distinct() {
        let presets = HyperParams::presets();
        assert_eq!(presets.len(), 3);
        for p in &presets {
            p.validate(256).unwrap();
        }
        let mut ids: Vec<String> = presets.iter().map(HyperParams::config_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(presets[0].config_id(), "emb300-nf100-fw3_5_7-do0p25-bs1024");
    }

    #[test]
    fn test_config_id_keeps_full_dropout() {
        let a = HyperParams::new().with_dropout(0.251);
        let b = HyperParams::new().with_dropout(0.249);
        a.validate(256).unwrap();
        b.validate(256).unwrap();
        assert_ne!(a.config_id(), b.config_id());
        assert_eq!(a.config_id(), "emb300-nf100-fw3_5_7-do0p251-bs1024");
        assert_eq!(HyperParams::new().with_dropout(0.0).config_id(), "emb300-nf100-fw3_5_7-do0-bs1024");
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        assert!(HyperParams::new().validate(5).is_err()); // width 7 > max_len
        assert!(HyperParams::new().with_filter_widths(vec![]).validate(256).is_err());
        assert!(HyperParams::new().with_filter_widths(vec![3, 3]).validate(256).is_err());
        assert!(HyperParams::new().with_dropout(1.0).validate(256).is_err());
        assert!(HyperParams::new().with_batch_size(0).validate(256).is_err());
        assert!(HyperParams::new().with_filter_count(0).validate(256).is_err());
    }
}
