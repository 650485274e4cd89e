// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the system works on:
// labelled reviews and the contracts other layers implement.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums, and traits

/// A labelled movie review and its sentiment
pub mod review;

/// Core abstractions implemented by loaders and classifiers
pub mod traits;

/// Sparse lexical feature vectors shared by featurizer and classifiers
pub mod features;
