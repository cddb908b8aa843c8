// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration      (Layer 2)
//   Step 2: Load positive/negative lines    (Layer 4 - data)
//   Step 3: Clean the text                  (Layer 4 - data)
//   Step 4: Create the run directory        (Layer 2)
//   Step 5: Build + save the vocabulary     (Layer 6 - infra)
//   Step 6: Encode samples, pad to max len  (Layer 4 - data)
//   Step 7: Shuffle + split train/dev       (Layer 4 - data)
//   Step 8: Save config for the run         (Layer 2)
//   Step 9: Run training loop               (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::data::{
    dataset::{EncodedSample, SequenceDataset},
    loader::PolarityCorpus,
    preprocessor::Preprocessor,
    splitter::split_train_dev,
};
use crate::domain::{error::TrainError, traits::CorpusSource};
use crate::infra::{
    checkpoint::write_json,
    vocab_store::{max_document_length, VocabStore},
};
use crate::ml::{
    optim::OptimizerKind,
    trainer::{run_training, TrainingReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All options for a training run. Built once from the CLI,
// passed by reference, and saved next to the checkpoints so a
// run can be reproduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub positive_data_file:    PathBuf,
    pub negative_data_file:    PathBuf,
    pub dev_sample_percentage: f64,
    pub cls_num:               usize,
    pub vocab_size:            usize,
    pub emb_size:              usize,
    pub hidden_sizes:          Vec<usize>,
    pub attention_size:        usize,
    pub keep_prob:             f64,
    pub l2_reg_lambda:         f64,
    pub lr:                    f64,
    pub batch_size:            usize,
    pub num_epochs:            usize,
    pub max_grad_norm:         f64,
    pub evaluate_every:        usize,
    pub checkpoint_every:      usize,
    pub num_checkpoints:       usize,
    pub opt:                   String,
    pub save_path:             PathBuf,
    pub seed:                  u64,
    pub cpu:                   bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            positive_data_file:    PathBuf::from("data/rt-polarity.pos"),
            negative_data_file:    PathBuf::from("data/rt-polarity.neg"),
            dev_sample_percentage: 0.1,
            cls_num:               2,
            vocab_size:            100_000,
            emb_size:              128,
            hidden_sizes:          vec![128],
            attention_size:        128,
            keep_prob:             0.5,
            l2_reg_lambda:         0.0,
            lr:                    1e-3,
            batch_size:            64,
            num_epochs:            100,
            max_grad_norm:         5.0,
            evaluate_every:        100,
            checkpoint_every:      100,
            num_checkpoints:       5,
            opt:                   OptimizerKind::Adam.to_string(),
            save_path:             PathBuf::from("save_models"),
            seed:                  10,
            cpu:                   false,
        }
    }
}

impl TrainConfig {
    /// Reject option values no run could succeed with. Model and loop
    /// configs re-check their own fields when built.
    pub fn validate(&self) -> Result<(), TrainError> {
        if !(0.0..1.0).contains(&self.dev_sample_percentage) {
            return Err(TrainError::config(format!(
                "dev_sample_percentage must be in [0, 1), got {}",
                self.dev_sample_percentage
            )));
        }
        if self.cls_num < 2 {
            return Err(TrainError::config(format!("cls_num must be at least 2, got {}", self.cls_num)));
        }
        if self.vocab_size < 3 {
            return Err(TrainError::config(format!(
                "vocab_size must leave room for <PAD>, <UNK> and one word, got {}",
                self.vocab_size
            )));
        }
        if self.hidden_sizes.is_empty() || self.hidden_sizes.contains(&0) {
            return Err(TrainError::config(format!(
                "hidden_sizes must be a non-empty list of positive sizes, got {:?}",
                self.hidden_sizes
            )));
        }
        if self.emb_size == 0 || self.attention_size == 0 {
            return Err(TrainError::config("emb_size and attention_size must be positive"));
        }
        if !(self.keep_prob > 0.0 && self.keep_prob <= 1.0) {
            return Err(TrainError::config(format!("keep_prob must be in (0, 1], got {}", self.keep_prob)));
        }
        if self.num_checkpoints == 0 {
            return Err(TrainError::config("num_checkpoints must be at least 1"));
        }
        self.opt.parse::<OptimizerKind>()?;
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load labelled lines ───────────────────────────────────────
        tracing::info!(
            "Loading data from '{}' and '{}'",
            cfg.positive_data_file.display(),
            cfg.negative_data_file.display()
        );
        let corpus   = PolarityCorpus::new(&cfg.positive_data_file, &cfg.negative_data_file);
        let examples = corpus.load_all()?;
        tracing::info!("Loaded {} examples", examples.len());

        // ── Step 3: Clean / normalise text ────────────────────────────────────
        let preprocessor = Preprocessor::new();
        let texts: Vec<String> = examples
            .iter()
            .map(|e| preprocessor.clean(&e.text))
            .collect();

        // ── Step 4: Run directory ─────────────────────────────────────────────
        let run_dir = create_run_dir(&cfg.save_path)?;
        tracing::info!("Writing to '{}'", run_dir.display());

        // ── Step 5: Vocabulary ────────────────────────────────────────────────
        let sequence_length = max_document_length(&texts);
        if sequence_length == 0 {
            return Err(TrainError::config("every example is empty after cleaning").into());
        }
        let vocab = VocabStore::new(run_dir.join("vocab")).build_and_save(&texts, cfg.vocab_size)?;
        tracing::info!("Vocabulary size: {}, sequence length: {}", vocab.len(), sequence_length);

        // ── Step 6: Encode ────────────────────────────────────────────────────
        // Labels travel as one-hot rows of the corpus' class count and are
        // checked against cls_num while being turned into class indices.
        let samples = examples
            .iter()
            .zip(&texts)
            .map(|(example, text)| -> Result<EncodedSample> {
                let tokens  = vocab.encode_padded(text, sequence_length)?;
                let one_hot = example
                    .one_hot(corpus.num_classes())
                    .with_context(|| format!("label {} out of range", example.label))?;
                Ok(EncodedSample::from_one_hot(tokens, &one_hot, cfg.cls_num)?)
            })
            .collect::<Result<Vec<_>>>()?;

        // ── Step 7: Train / dev split ─────────────────────────────────────────
        let (train_samples, dev_samples) =
            split_train_dev(samples, cfg.dev_sample_percentage, cfg.seed);
        tracing::info!("Train/Dev split: {}/{}", train_samples.len(), dev_samples.len());

        let train_dataset = SequenceDataset::new(train_samples, sequence_length, cfg.cls_num)?;
        let dev_dataset   = SequenceDataset::new(dev_samples, sequence_length, cfg.cls_num)?;
        tracing::debug!("Training class counts: {:?}", train_dataset.class_counts());

        // ── Step 8: Save config ───────────────────────────────────────────────
        let config_path = write_json(&run_dir, "train_config.json", cfg)?;
        tracing::debug!("Run configuration saved to '{}'", config_path.display());

        // ── Step 9: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, vocab.len(), train_dataset, dev_dataset, &run_dir)
    }
}

/// `save_path/<unix seconds>`; a numeric suffix is appended if that exists.
fn create_run_dir(save_path: &Path) -> Result<PathBuf> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before 1970")?
        .as_secs();

    let mut run_dir = save_path.join(stamp.to_string());
    let mut suffix  = 1;
    while run_dir.exists() {
        run_dir = save_path.join(format!("{stamp}-{suffix}"));
        suffix += 1;
    }
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;
    Ok(run_dir)
}
