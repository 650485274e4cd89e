// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn tensors lives here.
//
//   context.rs    — device + seed handed to every component
//
//   model.rs      — embedding → parallel Conv1d (one per filter
//                   width) → ReLU → max-over-time pooling →
//                   concatenate → dropout → single-logit head;
//                   plus the validated hyperparameter config
//
//   trainer.rs    — epoch loop with Adam, BCE-with-logits,
//                   validation checkpointing, early stopping
//                   and the sequential hyperparameter sweep
//
//   evaluator.rs  — gradient-free probabilities and losses
//
//   inferencer.rs — single-sentence predictor loaded from a
//                   checkpoint

/// Explicit device and seed
pub mod context;

/// Word-embedding CNN and its configs
pub mod model;

/// Training loop, early stopping and sweep
pub mod trainer;

/// Batch scoring over a dataset
pub mod evaluator;

/// Sentence-level predictor
pub mod inferencer;
