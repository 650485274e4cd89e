// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch driver with validation-driven checkpointing and early
// stopping:
//
//   best = +inf, stale = 0
//   for epoch in 1..=max_epochs:
//       train one pass   (forward → BCE-with-logits → backward → Adam)
//       validate         (inner backend, no autodiff, no dropout)
//       if mean val loss < best:  save checkpoint, best = loss, stale = 0
//       else:                     stale += 1
//       if stale == patience:     stop
//
// The state machine (`EarlyStopping`) and the epoch driver
// (`drive_epochs`) know nothing about Burn; `CnnRunner` plugs the
// actual model into them. A non-finite loss on any batch aborts
// the whole run.
//
// Each hyperparameter configuration gets its own checkpoint slot
// and returns a `RunResult`; `run_sweep` runs configurations
// strictly one after another.

use anyhow::{bail, Context, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::sigmoid, backend::AutodiffBackend},
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::data::batcher::{ReviewBatch, ReviewBatcher};
use crate::data::dataset::ReviewDataset;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger, TrainingHistory};
use crate::ml::context::ExecutionContext;
use crate::ml::evaluator;
use crate::ml::model::{CnnClassifier, CnnConfig, HyperParams};

// ─── Loop Settings ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TrainingConfig {
    #[config(default = 20)]
    pub max_epochs: usize,

    /// Consecutive epochs without validation improvement before stopping
    #[config(default = 3)]
    pub patience: usize,

    /// Adam step size
    #[config(default = 1e-3)]
    pub learning_rate: f64,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_epochs == 0 {
            bail!("max_epochs must be at least 1");
        }
        if self.patience == 0 {
            bail!("patience must be at least 1");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        Ok(())
    }
}

// ─── Early Stopping ───────────────────────────────────────────────────────────
/// What the stopper decided after one epoch's validation loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best loss; persist a checkpoint
    Improved,
    /// No improvement, patience not yet exhausted
    Stalled,
    /// Patience exhausted; terminate
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best:     f64,
    stale:    usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best: f64::INFINITY, stale: 0 }
    }

    pub fn observe(&mut self, val_loss: f64) -> Verdict {
        if val_loss < self.best {
            self.best  = val_loss;
            self.stale = 0;
            Verdict::Improved
        } else {
            self.stale += 1;
            if self.stale >= self.patience { Verdict::Stop } else { Verdict::Stalled }
        }
    }

    /// Lowest loss observed so far (+inf before the first epoch)
    pub fn best(&self) -> f64 {
        self.best
    }
}

// ─── Epoch Driver ─────────────────────────────────────────────────────────────
/// One training epoch plus its validation pass, and what to do when
/// validation improves.
pub trait EpochRunner {
    /// Train and validate once; return the mean validation loss.
    fn run_epoch(&mut self, epoch: usize) -> Result<f64>;

    /// Called right after `run_epoch` when the loss is a new best.
    fn on_improvement(&mut self, epoch: usize, val_loss: f64) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub best_val_loss: f64,
    pub best_epoch:    usize,
    pub epochs_run:    usize,
    pub stopped_early: bool,
}

pub fn drive_epochs<R: EpochRunner>(
    runner:     &mut R,
    max_epochs: usize,
    patience:   usize,
) -> Result<LoopSummary> {
    let mut stopper    = EarlyStopping::new(patience);
    let mut best_epoch = 0;
    let mut epochs_run = 0;
    let mut stopped    = false;

    for epoch in 1..=max_epochs {
        let val_loss = runner.run_epoch(epoch)?;
        epochs_run = epoch;
        if !val_loss.is_finite() {
            bail!("validation loss became {} at epoch {}", val_loss, epoch);
        }

        match stopper.observe(val_loss) {
            Verdict::Improved => {
                best_epoch = epoch;
                runner.on_improvement(epoch, val_loss)?;
            }
            Verdict::Stalled => {}
            Verdict::Stop => {
                println!("Early stopping: {patience} epochs without improvement");
                stopped = true;
                break;
            }
        }
    }

    Ok(LoopSummary {
        best_val_loss: stopper.best(),
        best_epoch,
        epochs_run,
        stopped_early: stopped,
    })
}

// ─── Run Result ───────────────────────────────────────────────────────────────
/// Outcome of training one hyperparameter configuration.
pub struct RunResult<B: Backend> {
    pub hyper:            HyperParams,
    pub config_id:        String,
    /// Validation loss of the freshly initialised model
    pub initial_val_loss: f64,
    pub best_val_loss:    f64,
    pub best_epoch:       usize,
    pub epochs_run:       usize,
    pub stopped_early:    bool,
    pub history:          TrainingHistory,
    /// Weights file of the best epoch
    pub checkpoint:       PathBuf,
    /// Parameters at the best epoch, ready for evaluation
    pub best_model:       CnnClassifier<B>,
}

// ─── Burn Runner ──────────────────────────────────────────────────────────────
struct CnnRunner<'a, B: AutodiffBackend, O> {
    model:        CnnClassifier<B>,
    optim:        O,
    lr:           f64,
    max_epochs:   usize,
    train_loader: Arc<dyn DataLoader<ReviewBatch<B>>>,
    valid_loader: Arc<dyn DataLoader<ReviewBatch<B::InnerBackend>>>,
    history:      TrainingHistory,
    logger:       MetricsLogger,
    ckpt:         &'a CheckpointManager,
    config_id:    &'a str,
    best_model:   Option<CnnClassifier<B::InnerBackend>>,
}

/// Fraction of rows where sigmoid(logit) ≥ 0.5 matches the label.
pub fn batch_accuracy<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 2, Int>) -> f64 {
    let [rows, _] = labels.dims();
    if rows == 0 {
        return 0.0;
    }
    let predicted = sigmoid(logits).greater_equal_elem(0.5).int();
    let correct = predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as f64 / rows as f64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { f64::NAN } else { values.iter().sum::<f64>() / values.len() as f64 }
}

impl<B, O> EpochRunner for CnnRunner<'_, B, O>
where
    B: AutodiffBackend,
    O: Optimizer<CnnClassifier<B>, B>,
{
    fn run_epoch(&mut self, epoch: usize) -> Result<f64> {
        // ── Training phase ────────────────────────────────────────────────────
        let mut model      = self.model.clone();
        let mut train_loss = Vec::new();
        let mut train_acc  = Vec::new();

        for batch in self.train_loader.iter() {
            let labels         = batch.labels.clone();
            let (loss, logits) = model.forward_loss(batch.ids, batch.labels);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bail!("training loss became {} at epoch {} batch {}", loss_val, epoch, train_loss.len());
            }
            train_loss.push(loss_val);
            train_acc.push(batch_accuracy(logits.detach(), labels));

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = self.optim.step(self.lr, model, grads);
        }
        self.model = model;

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = self.model.valid();
        let mut valid_loss = Vec::new();
        let mut valid_acc  = Vec::new();

        for batch in self.valid_loader.iter() {
            let labels         = batch.labels.clone();
            let (loss, logits) = model_valid.forward_loss(batch.ids, batch.labels);
            valid_loss.push(loss.into_scalar().elem::<f64>());
            valid_acc.push(batch_accuracy(logits, labels));
        }

        let metrics = EpochMetrics::new(
            epoch,
            mean(&train_loss),
            mean(&valid_loss),
            mean(&train_acc),
            mean(&valid_acc),
        );
        let improved = metrics.is_improvement(self.history.best_val_loss());

        println!(
            "[{}] Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | train_acc={:.1}% | val_acc={:.1}%",
            self.config_id,
            epoch,
            self.max_epochs,
            metrics.train_loss,
            metrics.val_loss,
            metrics.train_acc * 100.0,
            metrics.val_acc * 100.0,
        );
        self.logger.log(&metrics, improved)?;
        self.history.record_epoch(train_loss, train_acc, valid_loss, valid_acc, metrics.clone());

        Ok(metrics.val_loss)
    }

    fn on_improvement(&mut self, epoch: usize, val_loss: f64) -> Result<()> {
        println!("Saving model with loss: {val_loss:.6}");
        let snapshot = self.model.valid();
        self.ckpt.save_model(self.config_id, &snapshot)?;
        tracing::info!("Checkpoint for '{}' updated at epoch {}", self.config_id, epoch);
        self.best_model = Some(snapshot);
        Ok(())
    }
}

/// Train one configuration to completion (or early stop).
#[allow(clippy::too_many_arguments)]
pub fn train_run<B: AutodiffBackend>(
    ctx:        &ExecutionContext<B>,
    run_index:  u64,
    vocab_size: usize,
    max_len:    usize,
    pad_id:     usize,
    hyper:      &HyperParams,
    training:   &TrainingConfig,
    train:      ReviewDataset,
    valid:      ReviewDataset,
    ckpt:       &CheckpointManager,
) -> Result<RunResult<B::InnerBackend>> {
    hyper.validate(max_len)?;
    training.validate()?;
    if train.is_empty() || valid.is_empty() {
        bail!("training and validation sets must both be non-empty");
    }

    let config_id    = hyper.config_id();
    let model_config = CnnConfig::from_hyper(vocab_size, max_len, pad_id, hyper);
    ckpt.prepare_run(&config_id, &model_config)?;

    // ── Build model ───────────────────────────────────────────────────────────
    ctx.reseed(run_index);
    let model: CnnClassifier<B> = model_config.init(ctx.device());
    tracing::info!(
        "Run '{}': vocab={}, max_len={}, {} train / {} validation reviews",
        config_id,
        vocab_size,
        max_len,
        train.len(),
        valid.len()
    );

    let inner = ctx.inner();
    let initial_val_loss = evaluator::mean_loss(&model.valid(), valid.clone(), hyper.batch_size, &inner)?;
    tracing::info!("Run '{}': untrained validation loss {:.4}", config_id, initial_val_loss);

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ReviewBatcher::<B>::new(ctx.device().clone()))
        .batch_size(hyper.batch_size)
        .shuffle(ctx.seed().wrapping_add(run_index))
        .num_workers(1)
        .build(train);

    let valid_loader = DataLoaderBuilder::new(ReviewBatcher::<B::InnerBackend>::new(ctx.device().clone()))
        .batch_size(hyper.batch_size)
        .num_workers(1)
        .build(valid);

    let logger = MetricsLogger::new(ckpt.run_dir(&config_id))?;

    let mut runner = CnnRunner {
        model,
        optim: AdamConfig::new().init::<B, CnnClassifier<B>>(),
        lr: training.learning_rate,
        max_epochs: training.max_epochs,
        train_loader,
        valid_loader,
        history: TrainingHistory::default(),
        logger,
        ckpt,
        config_id: &config_id,
        best_model: None,
    };

    let summary = drive_epochs(&mut runner, training.max_epochs, training.patience)?;
    let CnnRunner { history, logger, best_model, .. } = runner;
    logger.write_history(&history)?;

    let best_model = best_model.context("training finished without a single validated epoch")?;
    let checkpoint = ckpt.model_file(&config_id);

    tracing::info!(
        "Run '{}' finished after {} epoch(s): best val_loss={:.4} at epoch {}",
        config_id,
        summary.epochs_run,
        summary.best_val_loss,
        summary.best_epoch
    );

    Ok(RunResult {
        hyper:            hyper.clone(),
        config_id,
        initial_val_loss,
        best_val_loss:    summary.best_val_loss,
        best_epoch:       summary.best_epoch,
        epochs_run:       summary.epochs_run,
        stopped_early:    summary.stopped_early,
        history,
        checkpoint,
        best_model,
    })
}

/// Train each configuration in order; results keep the input order.
#[allow(clippy::too_many_arguments)]
pub fn run_sweep<B: AutodiffBackend>(
    ctx:        &ExecutionContext<B>,
    configs:    &[HyperParams],
    vocab_size: usize,
    max_len:    usize,
    pad_id:     usize,
    training:   &TrainingConfig,
    train:      &ReviewDataset,
    valid:      &ReviewDataset,
    ckpt:       &CheckpointManager,
) -> Result<Vec<RunResult<B::InnerBackend>>> {
    let mut results = Vec::with_capacity(configs.len());
    for (i, hyper) in configs.iter().enumerate() {
        let result = train_run(
            ctx,
            i as u64,
            vocab_size,
            max_len,
            pad_id,
            hyper,
            training,
            train.clone(),
            valid.clone(),
            ckpt,
        )?;
        println!("params {}", result.config_id);
        println!("valid loss = {:.6}", result.best_val_loss);
        results.push(result);
    }
    Ok(results)
}

/// Run with the lowest best validation loss (first wins on ties).
pub fn best_run<B: Backend>(results: &[RunResult<B>]) -> Option<&RunResult<B>> {
    results
        .iter()
        .reduce(|best, r| if r.best_val_loss < best.best_val_loss { r } else { best })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ReviewItem;
    use crate::data::encoder::SequenceEncoder;
    use crate::data::tokenizer::BasicEnglishTokenizer;
    use crate::data::vocab::{VocabularyBuilder, PAD_ID};
    use crate::domain::review::{Review, Sentiment};
    use burn::backend::{Autodiff, NdArray};

    /// Replays a fixed validation-loss sequence.
    struct Scripted {
        losses:       Vec<f64>,
        improvements: Vec<usize>,
    }

    impl EpochRunner for Scripted {
        fn run_epoch(&mut self, epoch: usize) -> Result<f64> {
            Ok(self.losses[epoch - 1])
        }

        fn on_improvement(&mut self, epoch: usize, _val_loss: f64) -> Result<()> {
            self.improvements.push(epoch);
            Ok(())
        }
    }

    fn scripted(losses: &[f64]) -> Scripted {
        Scripted { losses: losses.to_vec(), improvements: Vec::new() }
    }

    #[test]
    fn test_early_stopping_state_machine() {
        let mut s = EarlyStopping::new(2);
        assert_eq!(s.observe(1.0), Verdict::Improved);
        assert_eq!(s.observe(1.0), Verdict::Stalled);
        assert_eq!(s.observe(0.5), Verdict::Improved);
        assert_eq!(s.observe(0.7), Verdict::Stalled);
        assert_eq!(s.observe(0.6), Verdict::Stop);
        assert_eq!(s.best(), 0.5);
    }

    #[test]
    fn test_stops_at_last_improvement_plus_patience() {
        // Last improvement at epoch 3 (0-based index 2), patience 3 → stop at epoch 6
        let mut r = scripted(&[0.9, 0.7, 0.6, 0.65, 0.61, 0.62, 0.1, 0.1]);
        let summary = drive_epochs(&mut r, 20, 3).unwrap();
        assert_eq!(summary.epochs_run, 6);
        assert!(summary.stopped_early);
        assert_eq!(summary.best_epoch, 3);
        assert_eq!(summary.best_val_loss, 0.6);
        assert_eq!(r.improvements, vec![1, 2, 3]);
    }

    #[test]
    fn test_reports_minimum_not_final_loss() {
        let mut r = scripted(&[0.5, 0.4, 0.8, 0.9]);
        let summary = drive_epochs(&mut r, 4, 3).unwrap();
        assert_eq!(summary.epochs_run, 4);
        assert!(!summary.stopped_early);
        assert_eq!(summary.best_val_loss, 0.4);
    }

    #[test]
    fn test_max_epochs_terminates() {
        let mut r = scripted(&[0.5, 0.4, 0.3]);
        let summary = drive_epochs(&mut r, 2, 3).unwrap();
        assert_eq!(summary.epochs_run, 2);
        assert_eq!(summary.best_val_loss, 0.4);
    }

    #[test]
    fn test_non_finite_loss_aborts() {
        let mut r = scripted(&[0.5, f64::NAN]);
        assert!(drive_epochs(&mut r, 5, 3).is_err());
        assert_eq!(r.improvements, vec![1]);
    }

    #[test]
    fn test_best_run_of_empty_sweep() {
        assert!(best_run::<NdArray>(&[]).is_none());
    }

    #[test]
    fn test_training_config_validation() {
        assert!(TrainingConfig::new().validate().is_ok());
        assert!(TrainingConfig::new().with_patience(0).validate().is_err());
        assert!(TrainingConfig::new().with_max_epochs(0).validate().is_err());
        assert!(TrainingConfig::new().with_learning_rate(-1.0).validate().is_err());
    }

    fn toy_corpus() -> Vec<Review> {
        let positive = [
            "a wonderful film, I loved it",
            "great acting and a great story",
            "loved every minute, wonderful",
            "brilliant and moving, great cast",
            "what a great and wonderful movie",
        ];
        let negative = [
            "a boring film, I hated it",
            "awful acting and a dull story",
            "hated every minute, boring",
            "terrible and slow, awful cast",
            "what a dull and boring movie",
        ];
        positive
            .iter()
            .map(|t| Review::new(*t, Sentiment::Positive))
            .chain(negative.iter().map(|t| Review::new(*t, Sentiment::Negative)))
            .collect()
    }

    #[test]
    fn test_toy_corpus_end_to_end() {
        type TrainB = Autodiff<NdArray>;

        let reviews = toy_corpus();
        let max_len = 8;
        let tok = BasicEnglishTokenizer::new(max_len);
        let mut builder = VocabularyBuilder::new(1).unwrap();
        for r in &reviews {
            builder.add_tokens(tok.tokenize(&r.text));
        }
        let vocab = builder.build();
        let data = ReviewDataset::encode(&reviews, &tok, &SequenceEncoder::new(max_len), &vocab);
        assert!(data.items().iter().all(|i: &ReviewItem| i.ids.len() == max_len));

        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let ctx = ExecutionContext::<TrainB>::new(Default::default(), 42);

        let hyper = HyperParams::new()
            .with_embedding_dim(8)
            .with_filter_count(4)
            .with_filter_widths(vec![2, 3])
            .with_dropout(0.0)
            .with_batch_size(10);
        let training = TrainingConfig::new().with_max_epochs(2).with_learning_rate(5e-3);

        let result = train_run(
            &ctx,
            0,
            vocab.len(),
            max_len,
            PAD_ID as usize,
            &hyper,
            &training,
            data.clone(),
            data.clone(),
            &ckpt,
        )
        .unwrap();

        assert_eq!(result.epochs_run, 2);
        assert!(result.best_val_loss.is_finite());
        assert!(result.best_val_loss <= result.initial_val_loss);
        assert!(result.best_epoch >= 1);
        assert_eq!(result.history.train_loss.len(), 2);
        assert_eq!(result.history.epochs.len(), 2);
        assert!(result.checkpoint.exists());

        // Adam never moves the masked <pad> row
        let pad = PAD_ID as usize;
        assert_eq!(result.best_model.embedding_row(pad), vec![0.0; 8]);

        // The persisted (half precision) checkpoint reproduces the best validation loss
        let inner    = ctx.inner();
        let cfg      = ckpt.load_model_config(&result.config_id).unwrap();
        let reloaded = ckpt.load_model::<NdArray>(&result.config_id, &cfg, inner.device()).unwrap();
        assert_eq!(reloaded.embedding_row(pad), vec![0.0; 8]);
        let reloaded_loss = evaluator::mean_loss(&reloaded, data, 10, &inner).unwrap();
        assert!(reloaded_loss.is_finite());
        assert!((reloaded_loss - result.best_val_loss).abs() < 5e-2);
    }
}
