// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands, `baseline`, `train` and
// `predict`, and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{baseline_use_case::BaselineConfig, train_use_case::TrainConfig};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit and score the TF-IDF baselines
    Baseline(BaselineArgs),

    /// Train the CNN sweep and evaluate the best run
    Train(TrainArgs),

    /// Score one sentence with a trained checkpoint
    Predict(PredictArgs),
}

/// Tensor backend for the CNN
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU via ndarray
    #[default]
    Ndarray,
    /// GPU via wgpu
    Wgpu,
}

#[derive(Args, Debug)]
pub struct BaselineArgs {
    /// CSV file with `review` and `sentiment` columns
    #[arg(long)]
    pub data: PathBuf,

    /// Directory for ROC CSV files
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Seed for the split and the stochastic models (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of the corpus held out for testing
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,
}

impl From<BaselineArgs> for BaselineConfig {
    fn from(a: BaselineArgs) -> Self {
        BaselineConfig {
            data_path:     a.data,
            report_dir:    a.report_dir,
            seed:          a.seed,
            test_fraction: a.test_fraction,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with `review` and `sentiment` columns
    #[arg(long)]
    pub data: PathBuf,

    /// Directory for per-run checkpoints, vocabulary and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Tokens kept per review; shorter reviews are padded
    #[arg(long, default_value_t = 256)]
    pub max_len: usize,

    /// Minimum training-split count for a token to get its own id
    #[arg(long, default_value_t = 5)]
    pub min_freq: usize,

    /// Upper bound on training epochs per configuration
    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Seed for splits, initialisation and shuffling (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON array of hyperparameter sets to sweep instead of the presets
    #[arg(long)]
    pub sweep: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:      a.data,
            checkpoint_dir: a.checkpoint_dir,
            max_len:        a.max_len,
            min_freq:       a.min_freq,
            epochs:         a.epochs,
            patience:       a.patience,
            lr:             a.lr,
            seed:           a.seed,
            sweep:          a.sweep,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// The sentence to score
    #[arg(long)]
    pub sentence: String,

    /// Directory where `train` saved its checkpoints
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Configuration id to load instead of the recorded best run
    #[arg(long)]
    pub run: Option<String>,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}
