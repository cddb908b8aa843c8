// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `train` subcommand and all its configurable
// flags. Flag names follow the option names saved in
// train_config.json.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for malformed values
//   - type conversion (string → usize, f64, Vec<usize>, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the BiLSTM-attention classifier on a polarity corpus
    Train(TrainArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    // ── Data ──────────────────────────────────────────────────────────────────
    /// File with one positive example per line
    #[arg(long, default_value = "data/rt-polarity.pos")]
    pub positive_data_file: PathBuf,

    /// File with one negative example per line
    #[arg(long, default_value = "data/rt-polarity.neg")]
    pub negative_data_file: PathBuf,

    /// Fraction of the examples held out for evaluation
    #[arg(long, default_value_t = 0.1)]
    pub dev_sample_percentage: f64,

    // ── Model ─────────────────────────────────────────────────────────────────
    /// Number of target classes
    #[arg(long, default_value_t = 2)]
    pub cls_num: usize,

    /// Maximum vocabulary size, <PAD> and <UNK> included
    #[arg(long, default_value_t = 100_000)]
    pub vocab_size: usize,

    /// Word embedding width
    #[arg(long, default_value_t = 128)]
    pub emb_size: usize,

    /// Per-direction LSTM units of each layer, bottom first (e.g. 128,64)
    #[arg(long, value_delimiter = ',', default_value = "128")]
    pub hidden_sizes: Vec<usize>,

    /// Width of the attention projection
    #[arg(long, default_value_t = 128)]
    pub attention_size: usize,

    /// Dropout keep probability during training
    #[arg(long, default_value_t = 0.5)]
    pub keep_prob: f64,

    /// L2 regularization strength (0 disables the penalty)
    #[arg(long, default_value_t = 0.0)]
    pub l2_reg_lambda: f64,

    // ── Training ──────────────────────────────────────────────────────────────
    /// Learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 100)]
    pub num_epochs: usize,

    /// Global gradient norm above which gradients are rescaled
    #[arg(long, default_value_t = 5.0)]
    pub max_grad_norm: f64,

    /// Evaluate on the dev split after this many steps
    #[arg(long, default_value_t = 100)]
    pub evaluate_every: usize,

    /// Save a checkpoint after this many steps
    #[arg(long, default_value_t = 100)]
    pub checkpoint_every: usize,

    /// Number of checkpoints to keep on disk
    #[arg(long, default_value_t = 5)]
    pub num_checkpoints: usize,

    /// Optimizer: adam, sgd, rmsprop or adagrad
    #[arg(long, default_value = "adam")]
    pub opt: String,

    /// Directory under which each run gets a timestamped folder
    #[arg(long, default_value = "save_models")]
    pub save_path: PathBuf,

    /// Seed for the train/dev split and batch shuffling
    #[arg(long, default_value_t = 10)]
    pub seed: u64,

    /// Train on the CPU (NdArray) instead of the GPU (WGPU)
    #[arg(long)]
    pub cpu: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            positive_data_file:    a.positive_data_file,
            negative_data_file:    a.negative_data_file,
            dev_sample_percentage: a.dev_sample_percentage,
            cls_num:               a.cls_num,
            vocab_size:            a.vocab_size,
            emb_size:              a.emb_size,
            hidden_sizes:          a.hidden_sizes,
            attention_size:        a.attention_size,
            keep_prob:             a.keep_prob,
            l2_reg_lambda:         a.l2_reg_lambda,
            lr:                    a.lr,
            batch_size:            a.batch_size,
            num_epochs:            a.num_epochs,
            max_grad_norm:         a.max_grad_norm,
            evaluate_every:        a.evaluate_every,
            checkpoint_every:      a.checkpoint_every,
            num_checkpoints:       a.num_checkpoints,
            opt:                   a.opt,
            save_path:             a.save_path,
            seed:                  a.seed,
            cpu:                   a.cpu,
        }
    }
}
