// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for each command:
//
//   baseline_use_case.rs — TF-IDF features + classical models
//   train_use_case.rs    — tokenize → vocabulary → encode →
//                          CNN sweep → test-set report
//   predict_use_case.rs  — score one sentence from a checkpoint
//
// No model math lives here, only workflow coordination.

use rand::Rng;

/// The baseline comparison workflow
pub mod baseline_use_case;

/// The CNN training workflow
pub mod train_use_case;

/// The single-sentence inference workflow
pub mod predict_use_case;

/// Use the caller's seed, or draw one and log it so the run can be
/// reproduced.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(s) => s,
        None => {
            let s = rand::thread_rng().gen::<u64>();
            tracing::info!("No seed given; using randomly drawn seed {}", s);
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_seed_is_kept() {
        assert_eq!(resolve_seed(Some(42)), 42);
    }
}
