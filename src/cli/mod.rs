// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. This is
// also the only place that picks a concrete Burn backend.
//
//   1. `baseline` — TF-IDF + logistic / SGD / random forest
//   2. `train`    — CNN hyperparameter sweep with early stopping
//   3. `predict`  — probability that a sentence is positive

pub mod commands;

use anyhow::Result;
use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    Autodiff, NdArray, Wgpu,
};
use clap::Parser;
use commands::{BackendKind, BaselineArgs, Commands, PredictArgs, TrainArgs};

use crate::application::{
    baseline_use_case::BaselineUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::{TrainSummary, TrainUseCase},
};

#[derive(Parser, Debug)]
#[command(
    name = "review-sentiment",
    version = "0.1.0",
    about = "Train TF-IDF baselines and a word-embedding CNN for movie-review sentiment, then score sentences."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Baseline(args) => run_baseline(args),
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

fn run_baseline(args: BaselineArgs) -> Result<()> {
    tracing::info!("Running baselines on: {}", args.data.display());
    let outcomes = BaselineUseCase::new(args.into()).execute()?;

    println!("\n{:<22}{:>10}{:>10}", "model", "accuracy", "auc");
    for o in &outcomes {
        println!("{:<22}{:>10.4}{:>10.4}", o.name, o.report.accuracy, o.auc);
    }
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on: {}", args.data.display());
    let backend = args.backend;
    let summary = match backend {
        BackendKind::Ndarray => {
            TrainUseCase::<Autodiff<NdArray>>::new(args.into(), NdArrayDevice::default()).execute()?
        }
        BackendKind::Wgpu => {
            TrainUseCase::<Autodiff<Wgpu>>::new(args.into(), WgpuDevice::default()).execute()?
        }
    };
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &TrainSummary) {
    println!("\nSeed: {}   Vocabulary: {} tokens", summary.seed, summary.vocab_size);
    println!(
        "{:<40}{:>12}{:>12}{:>10}{:>8}{:>8}",
        "config", "untrained", "best val", "val acc", "epoch", "ran"
    );
    for r in &summary.runs {
        let val_acc = r
            .best_epoch
            .checked_sub(1)
            .and_then(|i| r.epochs.get(i))
            .map_or(f64::NAN, |m| m.val_acc * 100.0);
        println!(
            "{:<40}{:>12.4}{:>12.4}{:>9.1}%{:>8}{:>8}",
            r.config_id, r.initial_val_loss, r.best_val_loss, val_acc, r.best_epoch, r.epochs_run
        );
    }
    println!("\nBest run: {}", summary.best.config_id);
    if let Some(best) = summary.runs.iter().find(|r| r.config_id == summary.best.config_id) {
        println!("Weights:  {}", best.checkpoint.display());
    }
    println!("\nTest set:\n{}", summary.test_report);
    println!("{}", summary.test_report.confusion);
    println!("ROC AUC: {:.4}", summary.test_auc);
    println!("Training complete. Checkpoints saved.");
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let prediction = match args.backend {
        BackendKind::Ndarray => {
            PredictUseCase::<NdArray>::new(args.checkpoint_dir, args.run, NdArrayDevice::default())?
                .predict(&args.sentence)?
        }
        BackendKind::Wgpu => {
            PredictUseCase::<Wgpu>::new(args.checkpoint_dir, args.run, WgpuDevice::default())?
                .predict(&args.sentence)?
        }
    };
    println!("{:.4}", prediction.probability);
    println!("Sentiment: {}", prediction.sentiment);
    Ok(())
}
