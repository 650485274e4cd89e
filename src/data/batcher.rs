// ============================================================
// Layer 4 — Review Batcher
// ============================================================
// Stacks ReviewItems into tensors for the forward pass:
//
//   Input:  N items, each with max_len ids
//   Output: ids    [N, max_len]  (Int)
//           labels [N, 1]        (Int, 0 or 1)
//
// Sequences are pre-padded by the encoder, so batching is a
// flatten + reshape.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::ReviewItem;

#[derive(Debug, Clone)]
pub struct ReviewBatch<B: Backend> {
    /// Token ids — shape [batch_size, max_len]
    pub ids: Tensor<B, 2, Int>,

    /// Ground-truth labels — shape [batch_size, 1]
    pub labels: Tensor<B, 2, Int>,
}

/// Holds the target device so tensors land on the right CPU/GPU.
#[derive(Clone, Debug)]
pub struct ReviewBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ReviewBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ReviewItem, ReviewBatch<B>> for ReviewBatcher<B> {
    fn batch(&self, items: Vec<ReviewItem>) -> ReviewBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |i| i.ids.len());

        let ids_flat: Vec<i64> = items
            .iter()
            .flat_map(|i| i.ids.iter().map(|&id| id as i64))
            .collect();
        let labels: Vec<i64> = items.iter().map(|i| i.label as i64).collect();

        let ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(ids_flat, [batch_size, seq_len]),
            &self.device,
        );
        let labels = Tensor::<B, 2, Int>::from_data(
            TensorData::new(labels, [batch_size, 1]),
            &self.device,
        );

        ReviewBatch { ids, labels }
    }
}
