// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a trained classifier over a dataset without gradients.
// Rows are visited in dataset order, so probabilities line up
// with `ReviewDataset::labels()`.

use anyhow::{anyhow, bail, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::data::batcher::ReviewBatcher;
use crate::data::dataset::ReviewDataset;
use crate::ml::context::ExecutionContext;
use crate::ml::model::CnnClassifier;

/// P(positive) for every review, in dataset order.
pub fn predict_probabilities<B: Backend>(
    model:      &CnnClassifier<B>,
    dataset:    ReviewDataset,
    batch_size: usize,
    ctx:        &ExecutionContext<B>,
) -> Result<Vec<f32>> {
    let expected = dataset.len();
    let loader = DataLoaderBuilder::new(ReviewBatcher::<B>::new(ctx.device().clone()))
        .batch_size(batch_size.max(1))
        .build(dataset);

    let mut probs = Vec::with_capacity(expected);
    for batch in loader.iter() {
        let p = sigmoid(model.forward(batch.ids))
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read probabilities: {:?}", e))?;
        probs.extend(p);
    }

    if probs.len() != expected {
        bail!("expected {} probabilities, got {}", expected, probs.len());
    }
    Ok(probs)
}

/// Mean over batches of the per-batch BCE loss, the same quantity
/// the training loop reports as validation loss.
pub fn mean_loss<B: Backend>(
    model:      &CnnClassifier<B>,
    dataset:    ReviewDataset,
    batch_size: usize,
    ctx:        &ExecutionContext<B>,
) -> Result<f64> {
    if dataset.is_empty() {
        bail!("cannot compute a loss over an empty dataset");
    }
    let loader = DataLoaderBuilder::new(ReviewBatcher::<B>::new(ctx.device().clone()))
        .batch_size(batch_size.max(1))
        .build(dataset);

    let mut losses = Vec::new();
    for batch in loader.iter() {
        let (loss, _) = model.forward_loss(batch.ids, batch.labels);
        losses.push(loss.into_scalar().elem::<f64>());
    }

    let mean = losses.iter().sum::<f64>() / losses.len() as f64;
    if !mean.is_finite() {
        bail!("loss is not finite ({})", mean);
    }
    Ok(mean)
}

/// Threshold probabilities at 0.5.
pub fn to_labels(probs: &[f32]) -> Vec<u8> {
    probs.iter().map(|&p| u8::from(p >= 0.5)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ReviewItem;
    use crate::ml::model::CnnConfig;
    use burn::backend::NdArray;

    fn tiny_model(ctx: &ExecutionContext<NdArray>) -> CnnClassifier<NdArray> {
        CnnConfig::new(12, 6, 1, 4, vec![2, 3], 3, 0.0).init(ctx.device())
    }

    fn dataset(n: usize) -> ReviewDataset {
        ReviewDataset::new(
            (0..n)
                .map(|i| ReviewItem { ids: vec![(i % 10) as u32 + 2, 3, 4, 1, 1, 1], label: (i % 2) as u8 })
                .collect(),
        )
    }

    #[test]
    fn test_probabilities_cover_every_row_in_range() {
        let ctx   = ExecutionContext::<NdArray>::new(Default::default(), 3);
        let model = tiny_model(&ctx);
        let probs = predict_probabilities(&model, dataset(7), 3, &ctx).unwrap();
        assert_eq!(probs.len(), 7);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_mean_loss_rejects_empty() {
        let ctx   = ExecutionContext::<NdArray>::new(Default::default(), 3);
        let model = tiny_model(&ctx);
        assert!(mean_loss(&model, ReviewDataset::default(), 4, &ctx).is_err());
        assert!(mean_loss(&model, dataset(4), 4, &ctx).unwrap() > 0.0);
    }

    #[test]
    fn test_to_labels_threshold() {
        assert_eq!(to_labels(&[0.1, 0.5, 0.9]), vec![0, 1, 1]);
    }
}
