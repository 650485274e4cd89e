// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the CNN pipeline in order:
//
//   Step 1: Load the CSV corpus                 (Layer 4 - data)
//   Step 2: Split train / test, then train / validation
//   Step 3: Build the vocabulary from train     (Layer 4 - data)
//   Step 4: Encode every split                  (Layer 4 - data)
//   Step 5: Run the hyperparameter sweep        (Layer 5 - ml)
//   Step 6: Evaluate the best run on test       (Layer 5 / 6)
//   Step 7: Record the best run for `predict`   (Layer 6 - infra)
//
// Only the training split ever feeds the vocabulary.

use anyhow::{bail, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::PathBuf};

use crate::application::resolve_seed;
use crate::data::{
    dataset::ReviewDataset,
    encoder::SequenceEncoder,
    loader::CsvReviewLoader,
    splitter::stratified_split,
    tokenizer::BasicEnglishTokenizer,
    vocab::{Vocabulary, VocabularyBuilder, PAD_ID},
};
use crate::domain::{review::Review, traits::ReviewSource};
use crate::infra::{
    checkpoint::{BestRun, CheckpointManager, RunRecord},
    report::{ClassificationReport, RocCurve},
};
use crate::ml::{
    context::ExecutionContext,
    evaluator,
    model::HyperParams,
    trainer::{best_run, run_sweep, TrainingConfig},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a `train` invocation needs. Serialisable so it can be
// stored next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:      PathBuf,
    pub checkpoint_dir: PathBuf,
    pub max_len:        usize,
    pub min_freq:       usize,
    pub test_fraction:  f64,
    pub valid_fraction: f64,
    pub epochs:         usize,
    pub patience:       usize,
    pub lr:             f64,
    pub seed:           Option<u64>,
    /// JSON array of hyperparameter sets; the three presets when `None`
    pub sweep:          Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      PathBuf::from("data/reviews.csv"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            max_len:        256,
            min_freq:       5,
            test_fraction:  0.2,
            valid_fraction: 0.1,
            epochs:         20,
            patience:       3,
            lr:             1e-3,
            seed:           None,
            sweep:          None,
        }
    }
}

impl TrainConfig {
    fn training(&self) -> TrainingConfig {
        TrainingConfig::new()
            .with_max_epochs(self.epochs)
            .with_patience(self.patience)
            .with_learning_rate(self.lr)
    }

    fn sweep_configs(&self) -> Result<Vec<HyperParams>> {
        let configs = match &self.sweep {
            None => HyperParams::presets(),
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Cannot read sweep file '{}'", path.display()))?;
                serde_json::from_str::<Vec<HyperParams>>(&json)
                    .with_context(|| format!("Sweep file '{}' is not a JSON array of configs", path.display()))?
            }
        };
        if configs.is_empty() {
            bail!("the sweep needs at least one configuration");
        }
        let mut seen = HashSet::new();
        for hyper in &configs {
            let id = hyper.config_id();
            hyper
                .validate(self.max_len)
                .with_context(|| format!("invalid configuration {}", id))?;
            if !seen.insert(id.clone()) {
                bail!("configuration {} appears more than once in the sweep", id);
            }
        }
        Ok(configs)
    }
}

/// One finished run, as reported back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TrainSummary {
    pub seed:        u64,
    pub vocab_size:  usize,
    pub runs:        Vec<RunRecord>,
    pub best:        BestRun,
    pub test_report: ClassificationReport,
    pub test_auc:    f64,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<B: AutodiffBackend> {
    config: TrainConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> TrainUseCase<B> {
    pub fn new(config: TrainConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg  = &self.config;
        let seed = resolve_seed(cfg.seed);

        let training = cfg.training();
        training.validate()?;
        let configs = cfg.sweep_configs()?;

        // ── Step 1: Load ──────────────────────────────────────────────────────
        tracing::info!("Loading reviews from '{}'", cfg.data_path.display());
        let reviews = CsvReviewLoader::new(&cfg.data_path).load_all()?;

        // ── Step 2: Split ─────────────────────────────────────────────────────
        let ctx     = ExecutionContext::<B>::new(self.device.clone(), seed);
        let mut rng = ctx.rng(0);
        let (train_full, test) = stratified_split(reviews, Review::label, cfg.test_fraction, &mut rng)?;
        let (train, valid) = stratified_split(train_full, Review::label, cfg.valid_fraction, &mut rng)?;
        tracing::info!(
            "Split: {} train, {} validation, {} test",
            train.len(),
            valid.len(),
            test.len()
        );

        // ── Step 3: Vocabulary (train split only) ─────────────────────────────
        let tokenizer = BasicEnglishTokenizer::new(cfg.max_len);
        let vocab     = build_vocabulary(&train, &tokenizer, cfg.min_freq)?;
        tracing::info!("Vocabulary: {} entries (min_freq={})", vocab.len(), vocab.min_freq());

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_vocab(&vocab)?;
        tracing::info!("Checkpoints go to '{}'", ckpt.dir().display());

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let encoder  = SequenceEncoder::new(cfg.max_len);
        let train_ds = ReviewDataset::encode(&train, &tokenizer, &encoder, &vocab);
        let valid_ds = ReviewDataset::encode(&valid, &tokenizer, &encoder, &vocab);
        let test_ds  = ReviewDataset::encode(&test, &tokenizer, &encoder, &vocab);

        // ── Step 5: Sweep ─────────────────────────────────────────────────────
        let results = run_sweep(
            &ctx,
            &configs,
            vocab.len(),
            cfg.max_len,
            PAD_ID as usize,
            &training,
            &train_ds,
            &valid_ds,
            &ckpt,
        )?;

        let mut runs = Vec::with_capacity(results.len());
        for r in &results {
            let record = RunRecord {
                config_id:        r.config_id.clone(),
                hyper:            r.hyper.clone(),
                initial_val_loss: r.initial_val_loss,
                best_val_loss:    r.best_val_loss,
                best_epoch:       r.best_epoch,
                epochs_run:       r.epochs_run,
                stopped_early:    r.stopped_early,
                checkpoint:       r.checkpoint.clone(),
                epochs:           r.history.epochs.clone(),
            };
            ckpt.save_run(&record)?;
            runs.push(record);
        }

        // ── Step 6: Test-set evaluation of the winner ─────────────────────────
        let best = best_run(&results).context("the sweep produced no runs")?;
        tracing::info!("Best run: '{}' (val_loss={:.4})", best.config_id, best.best_val_loss);

        let test_labels = test_ds.labels();
        let probs  = evaluator::predict_probabilities(&best.best_model, test_ds, best.hyper.batch_size, &ctx.inner())?;
        let preds  = evaluator::to_labels(&probs);
        let scores: Vec<f64> = probs.iter().map(|&p| f64::from(p)).collect();

        let test_report = ClassificationReport::from_labels(&test_labels, &preds)?;
        let roc         = RocCurve::from_scores(&test_labels, &scores)?;
        roc.write_csv(&ckpt.run_dir(&best.config_id).join("test_roc.csv"))?;

        // ── Step 7: Best-run pointer ──────────────────────────────────────────
        let best_pointer = BestRun {
            config_id:     best.config_id.clone(),
            best_val_loss: best.best_val_loss,
            seed,
        };
        ckpt.save_best(&best_pointer)?;

        Ok(TrainSummary {
            seed,
            vocab_size: vocab.len(),
            runs,
            best: best_pointer,
            test_report,
            test_auc: roc.auc,
        })
    }
}

/// Count tokens of the training reviews, in corpus order.
fn build_vocabulary(
    train:     &[Review],
    tokenizer: &BasicEnglishTokenizer,
    min_freq:  usize,
) -> Result<Vocabulary> {
    let mut builder = VocabularyBuilder::new(min_freq)?;
    for review in train {
        builder.add_tokens(tokenizer.tokenize(&review.text));
    }
    Ok(builder.build())
}
