// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics per run to CSV files.
//
// Two files per run directory:
//
//   metrics.csv — one row per epoch
//     epoch,train_loss,val_loss,train_acc,val_acc,improved
//     1,0.693100,0.688200,0.512000,0.534000,true
//
//   batches.csv — one row per batch, the raw learning curves
//     split,epoch,step,loss,accuracy
//     train,1,0,0.693500,0.500000
//
// Losses are mean binary cross-entropy; accuracies use a 0.5
// threshold on the sigmoid output.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean of the per-batch training losses
    pub train_loss: f64,

    /// Mean of the per-batch validation losses; drives checkpointing
    pub val_loss: f64,

    /// Range: [0.0, 1.0]
    pub train_acc: f64,

    /// Range: [0.0, 1.0]
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        val_loss:   f64,
        train_acc:  f64,
        val_acc:    f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, train_acc, val_acc }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Per-batch learning curves plus the epoch summaries of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// `train_loss[e][b]` is batch `b` of epoch `e + 1`
    pub train_loss: Vec<Vec<f64>>,
    pub train_acc:  Vec<Vec<f64>>,
    pub valid_loss: Vec<Vec<f64>>,
    pub valid_acc:  Vec<Vec<f64>>,
    pub epochs:     Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn record_epoch(
        &mut self,
        train_loss: Vec<f64>,
        train_acc:  Vec<f64>,
        valid_loss: Vec<f64>,
        valid_acc:  Vec<f64>,
        summary:    EpochMetrics,
    ) {
        self.train_loss.push(train_loss);
        self.train_acc.push(train_acc);
        self.valid_loss.push(valid_loss);
        self.valid_acc.push(valid_acc);
        self.epochs.push(summary);
    }

    /// Lowest epoch validation loss so far, +inf when empty
    pub fn best_val_loss(&self) -> f64 {
        self.epochs
            .iter()
            .map(|m| m.val_loss)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Logs epoch metrics of one run to CSV.
pub struct MetricsLogger {
    csv_path:     PathBuf,
    batches_path: PathBuf,
}

impl MetricsLogger {
    /// Starts a fresh metrics.csv in `dir` (header only).
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)?;
        writeln!(f, "epoch,train_loss,val_loss,train_acc,val_acc,improved")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path, batches_path: dir.join("batches.csv") })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics, improved: bool) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{}",
            m.epoch, m.train_loss, m.val_loss, m.train_acc, m.val_acc, improved,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    /// Dump every batch of `history` to batches.csv.
    pub fn write_history(&self, history: &TrainingHistory) -> Result<()> {
        let mut f = fs::File::create(&self.batches_path)?;
        writeln!(f, "split,epoch,step,loss,accuracy")?;

        let splits = [
            ("train", &history.train_loss, &history.train_acc),
            ("valid", &history.valid_loss, &history.valid_acc),
        ];
        for (split, losses, accs) in splits {
            for (e, (epoch_losses, epoch_accs)) in losses.iter().zip(accs.iter()).enumerate() {
                for (step, (loss, acc)) in epoch_losses.iter().zip(epoch_accs.iter()).enumerate() {
                    writeln!(f, "{},{},{},{:.6},{:.6}", split, e + 1, step, loss, acc)?;
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    #[cfg(test)]
    pub(crate) fn batches_path(&self) -> &Path {
        &self.batches_path
    }
}
