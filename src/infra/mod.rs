// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns used by the training
// pipeline:
//
//   checkpoint.rs   — Model snapshots
//                     Full-precision MessagePack files via
//                     stage-then-rename, bounded retention
//                     (oldest evicted first), run config JSON.
//
//   vocab_store.rs  — Vocabulary persistence
//                     Builds the word-level vocabulary once
//                     per run and saves it beside the
//                     checkpoints.
//
//   metrics.rs      — Scalar summaries
//                     Loss / accuracy / gradient norm per
//                     step and gradient sparsity per
//                     parameter, as CSV.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving, retention and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
