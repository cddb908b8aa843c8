// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven train / evaluate / checkpoint loop.
//
// One step:
//   forward (Mode::Train) → finite loss?  → backward
//   → clip to max_grad_norm → finite norm? → optimizer update
//   → step += 1
// then, on cadence:
//   step % evaluate_every   == 0 → dev pass on model.valid()
//   step % checkpoint_every == 0 → CheckpointManager::save
//
// Key Burn 0.20 insight:
//   - Training uses B: AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - Evaluation batcher must also use B::InnerBackend
//   - Optimizer is not object-safe, so the optimizer choice is
//     dispatched once with a match and the loop is generic
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam
//            Pascanu et al. (2013) gradient clipping

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    module::AutodiffModule,
    optim::{AdaGradConfig, AdamConfig, GradientsParams, Optimizer, RmsPropConfig, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::Path;

use super::{
    clip::clip_global_norm,
    model::{TextClassifier, TextClassifierConfig},
    optim::OptimizerKind,
    Mode,
};
use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{EpochBatches, IndexBatch, SequenceBatch, SequenceBatcher},
    dataset::SequenceDataset,
};
use crate::domain::error::TrainError;
use crate::infra::{
    checkpoint::{CheckpointEntry, CheckpointManager},
    metrics::{MetricsLogger, StepMetrics},
};

// ─── Loop configuration ───────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub batch_size:       usize,
    pub num_epochs:       usize,
    #[config(default = 1e-3)]
    pub learning_rate:    f64,
    #[config(default = 5.0)]
    pub max_grad_norm:    f64,
    #[config(default = 100)]
    pub evaluate_every:   usize,
    #[config(default = 100)]
    pub checkpoint_every: usize,
    #[config(default = 10)]
    pub seed:             u64,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), TrainError> {
        let counts = [
            ("batch_size", self.batch_size),
            ("num_epochs", self.num_epochs),
            ("evaluate_every", self.evaluate_every),
            ("checkpoint_every", self.checkpoint_every),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, v)| *v == 0) {
            return Err(TrainError::config(format!("{name} must be at least 1")));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TrainError::config(format!("lr must be positive, got {}", self.learning_rate)));
        }
        if !(self.max_grad_norm > 0.0 && self.max_grad_norm.is_finite()) {
            return Err(TrainError::config(format!(
                "max_grad_norm must be positive, got {}",
                self.max_grad_norm
            )));
        }
        Ok(())
    }
}

// ─── Summaries ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    Initializing,
    Running,
    Evaluating,
    Checkpointing,
    Completed,
    /// `fit` or `train_step` returned an error; the run cannot continue.
    Failed,
}

/// Outcome of one applied update.
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub step:        usize,
    pub loss:        f64,
    pub accuracy:    f64,
    /// Global gradient norm before clipping
    pub grad_norm:   f64,
    pub clipped:     bool,
    pub sparsity:    Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalSummary {
    pub step:     usize,
    pub loss:     f64,
    pub accuracy: f64,
    pub examples: usize,
}

#[derive(Debug, Default)]
pub struct TrainingReport {
    pub steps:              usize,
    pub evaluations:        Vec<EvalSummary>,
    pub checkpoints:        Vec<CheckpointEntry>,
    pub failed_checkpoints: usize,
    pub last_train:         Option<StepSummary>,
}

// ─── Trainer ──────────────────────────────────────────────────────────────────

/// Owns the model, the optimizer state and the persistence sinks for one run.
pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TextClassifier<B>, B>,
{
    model:       TextClassifier<B>,
    optim:       O,
    config:      TrainingConfig,
    checkpoints: CheckpointManager,
    metrics:     Option<MetricsLogger>,
    device:      B::Device,
    step:        usize,
    phase:       TrainingPhase,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TextClassifier<B>, B>,
{
    pub fn new(
        model:       TextClassifier<B>,
        optim:       O,
        config:      TrainingConfig,
        checkpoints: CheckpointManager,
        device:      B::Device,
    ) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self {
            model, optim, config, checkpoints,
            metrics: None,
            device,
            step:  0,
            phase: TrainingPhase::Initializing,
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Number of updates applied so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn model(&self) -> &TextClassifier<B> {
        &self.model
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Run `num_epochs` passes over `train`, evaluating on `dev` and
    /// checkpointing on the configured cadence. Ends in `Completed` on
    /// success and `Failed` on any error.
    pub fn fit(&mut self, train: &SequenceDataset, dev: &SequenceDataset) -> Result<TrainingReport, TrainError> {
        match self.run_epochs(train, dev) {
            Ok(report) => {
                self.phase = TrainingPhase::Completed;
                tracing::info!("Training complete after {} steps", self.step);
                Ok(report)
            }
            Err(e) => {
                self.phase = TrainingPhase::Failed;
                tracing::error!("Training stopped at step {}: {}", self.step, e);
                Err(e)
            }
        }
    }

    fn run_epochs(&mut self, train: &SequenceDataset, dev: &SequenceDataset) -> Result<TrainingReport, TrainError> {
        self.check_compatible(train, "training")?;
        self.check_compatible(dev, "dev")?;
        if train.samples().is_empty() {
            return Err(TrainError::config("the training split is empty"));
        }

        let seq_len = self.model.sequence_length();
        let batcher = SequenceBatcher::<B>::new(self.device.clone());
        let stream  = EpochBatches::new(
            train.samples().len(),
            self.config.batch_size,
            self.config.num_epochs,
            self.config.seed,
        );
        tracing::info!(
            "Training {} steps ({} epochs × {} batches of ≤{})",
            stream.total_batches(),
            self.config.num_epochs,
            stream.batches_per_epoch(),
            self.config.batch_size,
        );

        let mut report        = TrainingReport::default();
        let mut current_epoch = None;
        self.phase = TrainingPhase::Running;

        for IndexBatch { epoch, indices } in stream {
            if current_epoch != Some(epoch) {
                current_epoch = Some(epoch);
                tracing::info!("Epoch {}/{}", epoch, self.config.num_epochs);
            }

            let batch   = batcher.batch(&train.gather(&indices), seq_len)?;
            let summary = self.train_step(batch)?;
            self.record_train(&summary);
            report.last_train = Some(summary);

            if self.step % self.config.evaluate_every == 0 {
                self.phase = TrainingPhase::Evaluating;
                if let Some(eval) = self.evaluate(dev)? {
                    self.record_eval(&eval);
                    report.evaluations.push(eval);
                }
            }

            if self.step % self.config.checkpoint_every == 0 {
                self.phase = TrainingPhase::Checkpointing;
                match self.checkpoints.save::<B, _>(self.step, &self.model) {
                    Ok(path) => {
                        tracing::info!("Saved model checkpoint to '{}'", path.display());
                        report.checkpoints.push(CheckpointEntry { step: self.step, path });
                    }
                    Err(e) if e.is_recoverable() => {
                        tracing::warn!("Checkpoint at step {} failed: {}", self.step, e);
                        report.failed_checkpoints += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            self.phase = TrainingPhase::Running;
        }

        report.steps = self.step;
        Ok(report)
    }

    /// Apply one update. The step counter advances only when the update is
    /// applied; a divergent loss or gradient leaves both model and counter
    /// untouched and moves the trainer to `Failed`.
    pub fn train_step(&mut self, batch: SequenceBatch<B>) -> Result<StepSummary, TrainError> {
        let next   = self.step + 1;
        let output = self.model.forward_classification(batch.tokens, batch.labels, Mode::Train);

        let loss = output.loss.clone().into_scalar().elem::<f64>();
        if let Err(e) = ensure_finite(next, "loss", loss) {
            self.phase = TrainingPhase::Failed;
            return Err(e);
        }
        let accuracy = output.accuracy();

        let mut grads = GradientsParams::from_grads(output.loss.backward(), &self.model);
        let report    = clip_global_norm::<B, _>(&self.model, &mut grads, self.config.max_grad_norm);
        if let Err(e) = ensure_finite(next, "gradient norm", report.global_norm) {
            self.phase = TrainingPhase::Failed;
            return Err(e);
        }

        self.model = self.optim.step(self.config.learning_rate, self.model.clone(), grads);
        self.step  = next;

        Ok(StepSummary {
            step: next,
            loss,
            accuracy,
            grad_norm: report.global_norm,
            clipped:   report.clipped,
            sparsity:  report.sparsity,
        })
    }

    /// Loss and accuracy over all of `dev`, in chunks of `batch_size`, with
    /// dropout off. Returns None for an empty split.
    pub fn evaluate(&self, dev: &SequenceDataset) -> Result<Option<EvalSummary>, TrainError> {
        if dev.samples().is_empty() {
            tracing::warn!("Dev split is empty, skipping evaluation at step {}", self.step);
            return Ok(None);
        }

        // model.valid() → TextClassifier<B::InnerBackend>, no autodiff graph
        let model   = self.model.valid();
        let batcher = SequenceBatcher::<B::InnerBackend>::new(self.device.clone());
        let seq_len = model.sequence_length();

        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut total    = 0usize;

        for chunk in dev.samples().chunks(self.config.batch_size) {
            let batch  = batcher.batch(chunk, seq_len)?;
            let n      = batch.size();
            let output = model.forward_classification(batch.tokens, batch.labels, Mode::Eval);

            loss_sum += output.loss.clone().into_scalar().elem::<f64>() * n as f64;
            correct  += output.correct();
            total    += n;
        }

        Ok(Some(EvalSummary {
            step:     self.step,
            loss:     loss_sum / total as f64,
            accuracy: correct as f64 / total as f64,
            examples: total,
        }))
    }

    fn check_compatible(&self, dataset: &SequenceDataset, split: &str) -> Result<(), TrainError> {
        if dataset.num_classes() != self.model.num_classes() {
            return Err(TrainError::config(format!(
                "{split} labels have width {} but the model has cls_num={}",
                dataset.num_classes(),
                self.model.num_classes()
            )));
        }
        if dataset.sequence_length() != self.model.sequence_length() {
            return Err(TrainError::ShapeMismatch {
                what:     "sequence length",
                expected: self.model.sequence_length(),
                found:    dataset.sequence_length(),
            });
        }
        Ok(())
    }

    fn record_train(&self, s: &StepSummary) {
        tracing::info!(
            "step {}, loss {:.6}, acc {:.4}, grad_norm {:.4}{}",
            s.step, s.loss, s.accuracy, s.grad_norm,
            if s.clipped { " (clipped)" } else { "" },
        );
        for (param, frac) in &s.sparsity {
            tracing::debug!("step {} grad sparsity {}: {:.4}", s.step, param, frac);
        }

        let Some(metrics) = &self.metrics else { return };
        if let Err(e) = metrics
            .log(&StepMetrics::train(s.step, s.loss, s.accuracy, s.grad_norm))
            .and_then(|_| metrics.log_sparsity(s.step, &s.sparsity))
        {
            tracing::warn!("Cannot write training metrics: {}", e);
        }
    }

    fn record_eval(&self, e: &EvalSummary) {
        tracing::info!(
            "Evaluation at step {}: loss {:.6}, acc {:.4} ({} examples)",
            e.step, e.loss, e.accuracy, e.examples,
        );
        let Some(metrics) = &self.metrics else { return };
        if let Err(err) = metrics.log(&StepMetrics::dev(e.step, e.loss, e.accuracy)) {
            tracing::warn!("Cannot write evaluation metrics: {}", err);
        }
    }
}

/// `NumericDivergence` unless `value` is finite.
pub fn ensure_finite(step: usize, quantity: &'static str, value: f64) -> Result<(), TrainError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TrainError::NumericDivergence { step, quantity, value })
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

/// Build the model and optimizer described by `cfg` and train on the chosen
/// device. Checkpoints and metrics go under `run_dir`.
pub fn run_training(
    cfg:           &TrainConfig,
    vocab_size:    usize,
    train_dataset: SequenceDataset,
    dev_dataset:   SequenceDataset,
    run_dir:       &Path,
) -> Result<TrainingReport> {
    if cfg.cpu {
        let device = NdArrayDevice::default();
        tracing::info!("Using NdArray device: {:?}", device);
        train_on::<Autodiff<NdArray>>(cfg, vocab_size, &train_dataset, &dev_dataset, run_dir, device)
    } else {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        train_on::<Autodiff<Wgpu>>(cfg, vocab_size, &train_dataset, &dev_dataset, run_dir, device)
    }
}

fn train_on<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    vocab_size: usize,
    train:      &SequenceDataset,
    dev:        &SequenceDataset,
    run_dir:    &Path,
    device:     B::Device,
) -> Result<TrainingReport> {
    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = TextClassifierConfig::new(
        cfg.cls_num,
        vocab_size,
        cfg.emb_size,
        train.sequence_length(),
        cfg.hidden_sizes.clone(),
        cfg.attention_size,
    )
    .with_keep_prob(cfg.keep_prob)
    .with_l2_reg_lambda(cfg.l2_reg_lambda);
    let model: TextClassifier<B> = model_cfg.init(&device)?;
    tracing::info!(
        "Model ready: {} BiLSTM layer(s) {:?}, attention_size={}, {} classes",
        cfg.hidden_sizes.len(), cfg.hidden_sizes, cfg.attention_size, cfg.cls_num
    );

    let training = TrainingConfig::new(cfg.batch_size, cfg.num_epochs)
        .with_learning_rate(cfg.lr)
        .with_max_grad_norm(cfg.max_grad_norm)
        .with_evaluate_every(cfg.evaluate_every)
        .with_checkpoint_every(cfg.checkpoint_every)
        .with_seed(cfg.seed);

    let checkpoints = CheckpointManager::new(run_dir.join("checkpoints"), cfg.num_checkpoints)?;
    let metrics     = MetricsLogger::new(run_dir)?;

    // ── Optimizer ─────────────────────────────────────────────────────────────
    let kind: OptimizerKind = cfg.opt.parse()?;
    tracing::info!("Optimizer: {} (lr={})", kind, cfg.lr);
    let report = match kind {
        OptimizerKind::Adam => fit_with(
            model, AdamConfig::new().with_epsilon(1e-8).init::<B, TextClassifier<B>>(),
            training, checkpoints, metrics, device, train, dev,
        ),
        OptimizerKind::Sgd => fit_with(
            model, SgdConfig::new().init::<B, TextClassifier<B>>(),
            training, checkpoints, metrics, device, train, dev,
        ),
        OptimizerKind::RmsProp => fit_with(
            model, RmsPropConfig::new().init::<B, TextClassifier<B>>(),
            training, checkpoints, metrics, device, train, dev,
        ),
        OptimizerKind::AdaGrad => fit_with(
            model, AdaGradConfig::new().init::<B, TextClassifier<B>>(),
            training, checkpoints, metrics, device, train, dev,
        ),
    };

    report.context("training failed")
}

#[allow(clippy::too_many_arguments)]
fn fit_with<B, O>(
    model:       TextClassifier<B>,
    optim:       O,
    training:    TrainingConfig,
    checkpoints: CheckpointManager,
    metrics:     MetricsLogger,
    device:      B::Device,
    train:       &SequenceDataset,
    dev:         &SequenceDataset,
) -> Result<TrainingReport, TrainError>
where
    B: AutodiffBackend,
    O: Optimizer<TextClassifier<B>, B>,
{
    let mut trainer = Trainer::new(model, optim, training, checkpoints, device)?.with_metrics(metrics);
    trainer.fit(train, dev)
}
