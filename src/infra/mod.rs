// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs — per-configuration weight files (Burn's
//                   CompactRecorder), the architecture JSON needed
//                   to rebuild a model, the shared vocabulary and
//                   the best-run pointer
//
//   metrics.rs    — per-epoch and per-batch training CSVs
//
//   report.rs     — classification report, confusion matrix
//                   and ROC curve for any binary classifier

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Evaluation reports
pub mod report;
