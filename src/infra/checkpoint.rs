// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Every hyperparameter configuration owns its own slot, so a
// sweep never overwrites one run's best weights with another's:
//
//   checkpoints/
//     vocab.json                     ← shared vocabulary (train split)
//     best_run.json                  ← which config won the sweep
//     emb300-nf100-fw3_5_7-do0p25-bs1024/
//       model.mpk                    ← best-epoch weights
//       model_config.json            ← architecture to rebuild the model
//       run.json                     ← losses and epochs for the run
//       metrics.csv / batches.csv    ← written by MetricsLogger
//
// Weights are only loadable into a model built from the matching
// model_config.json; the recorder fails on any shape mismatch.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::vocab::Vocabulary;
use crate::infra::metrics::EpochMetrics;
use crate::ml::model::{CnnClassifier, CnnConfig, HyperParams};

const MODEL_FILE:  &str = "model";
/// Extension `CompactRecorder` appends to `MODEL_FILE`
const MODEL_EXT:   &str = "mpk";
const CONFIG_FILE: &str = "model_config.json";
const RUN_FILE:    &str = "run.json";
const VOCAB_FILE:  &str = "vocab.json";
const BEST_FILE:   &str = "best_run.json";

/// Persisted summary of one finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub config_id:        String,
    pub hyper:            HyperParams,
    pub initial_val_loss: f64,
    pub best_val_loss:    f64,
    pub best_epoch:       usize,
    pub epochs_run:       usize,
    pub stopped_early:    bool,
    /// Weights file of the best epoch
    pub checkpoint:       PathBuf,
    pub epochs:           Vec<EpochMetrics>,
}

/// Pointer to the sweep winner, read by `predict` when no run is named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRun {
    pub config_id:     String,
    pub best_val_loss: f64,
    pub seed:          u64,
}

/// Manages the checkpoint directory tree.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory (and parents) if missing.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_dir(&self, config_id: &str) -> PathBuf {
        self.dir.join(config_id)
    }

    /// Recorder path for a run's weights (extension added by the recorder).
    pub fn model_path(&self, config_id: &str) -> PathBuf {
        self.run_dir(config_id).join(MODEL_FILE)
    }

    /// The weights file as it exists on disk.
    pub fn model_file(&self, config_id: &str) -> PathBuf {
        self.model_path(config_id).with_extension(MODEL_EXT)
    }

    /// Create the run slot and write its architecture before training.
    pub fn prepare_run(&self, config_id: &str, cfg: &CnnConfig) -> Result<()> {
        let dir = self.run_dir(config_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
        write_json(&dir.join(CONFIG_FILE), cfg)
    }

    /// Overwrite the run's weights with `model`.
    pub fn save_model<B: Backend>(&self, config_id: &str, model: &CnnClassifier<B>) -> Result<()> {
        let path = self.model_path(config_id);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved checkpoint for '{}'", config_id);
        Ok(())
    }

    pub fn load_model_config(&self, config_id: &str) -> Result<CnnConfig> {
        read_json(
            &self.run_dir(config_id).join(CONFIG_FILE),
            "Make sure you have run 'train' before 'predict'.",
        )
    }

    /// Rebuild the architecture from `cfg` and restore the saved weights.
    pub fn load_model<B: Backend>(
        &self,
        config_id: &str,
        cfg:       &CnnConfig,
        device:    &B::Device,
    ) -> Result<CnnClassifier<B>> {
        let path = self.model_path(config_id);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained this run?", path.display())
            })?;
        Ok(cfg.init::<B>(device).load_record(record))
    }

    pub fn save_run(&self, record: &RunRecord) -> Result<()> {
        write_json(&self.run_dir(&record.config_id).join(RUN_FILE), record)
    }

    #[cfg(test)]
    pub(crate) fn load_run(&self, config_id: &str) -> Result<RunRecord> {
        read_json(&self.run_dir(config_id).join(RUN_FILE), "Has this run finished?")
    }

    pub fn save_vocab(&self, vocab: &Vocabulary) -> Result<()> {
        vocab.save(&self.dir.join(VOCAB_FILE))
    }

    pub fn load_vocab(&self) -> Result<Vocabulary> {
        Vocabulary::load(&self.dir.join(VOCAB_FILE))
    }

    pub fn save_best(&self, best: &BestRun) -> Result<()> {
        write_json(&self.dir.join(BEST_FILE), best)
    }

    pub fn load_best(&self) -> Result<BestRun> {
        read_json(&self.dir.join(BEST_FILE), "Have you run 'train' first?")
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, hint: &str) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'. {}", path.display(), hint))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}
