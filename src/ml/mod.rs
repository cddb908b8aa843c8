// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and training code lives here.
//
//   encoder.rs    — Stacked bidirectional LSTM
//                   forward + backward cell per layer,
//                   outputs folded (summed) back to the
//                   per-direction width
//
//   attention.rs  — Soft attention pooling
//                   [B, T, H] → [B, H] with learned
//                   per-step weights that sum to 1
//
//   model.rs      — Embedding → encoder → attention → head,
//                   cross-entropy + L2 loss, accuracy
//
//   clip.rs       — Global gradient-norm clipping and
//                   per-parameter gradient sparsity
//
//   optim.rs      — Optimizer identifiers (adam, sgd, ...)
//
//   trainer.rs    — The cadence-driven training loop:
//                   step, evaluate every N, checkpoint every M
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM
//            Yang et al. (2016) Hierarchical Attention Networks

/// Stacked bidirectional LSTM encoder
pub mod encoder;

/// Soft attention pooling over time steps
pub mod attention;

/// Full classifier and its head
pub mod model;

/// Gradient norm clipping
pub mod clip;

/// Optimizer selection
pub mod optim;

/// Training loop with evaluation and checkpointing
pub mod trainer;

/// Execution mode threaded through every forward pass.
///
/// `Train` applies dropout with the configured keep probability;
/// `Eval` behaves as keep probability 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}
