// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the CSV file and tensor batches:
//
//   CSV file
//       │
//       ▼
//   CsvReviewLoader      → labelled reviews
//       │
//       ▼
//   stratified_split     → train / validation / test
//       │
//       ▼
//   BasicEnglishTokenizer → lowercase tokens (≤ max_len)
//       │
//       ▼
//   VocabularyBuilder    → token ids (training split only)
//       │
//       ▼
//   SequenceEncoder      → fixed-length id sequences
//       │
//       ▼
//   ReviewDataset        → Burn Dataset
//       │
//       ▼
//   ReviewBatcher        → [batch, max_len] tensors

/// Reads the review corpus from CSV
pub mod loader;

/// Class-balanced train/held-out partitioning
pub mod splitter;

/// Rule-based lowercase word tokenizer
pub mod tokenizer;

/// Frequency-thresholded vocabulary with reserved ids
pub mod vocab;

/// Fixed-length id sequence encoding
pub mod encoder;

/// Burn Dataset over encoded reviews
pub mod dataset;

/// Burn Batcher producing id/label tensors
pub mod batcher;
